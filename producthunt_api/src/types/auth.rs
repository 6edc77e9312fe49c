use serde::{Deserialize, Serialize};

/// Response of `POST /v2/oauth/token` for the client-credentials grant.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    /// Lifetime in seconds. Client tokens often omit it.
    pub expires_in: Option<u64>,
}
