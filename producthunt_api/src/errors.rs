//! Error types for the API client.

/// Errors that can occur when making API requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The client could not be constructed or the request could not be built.
    #[error("Request failed")]
    RequestFailed,
    /// Client ID or secret was empty.
    #[error("Missing API credentials")]
    MissingCredentials,
    /// The configured base URL could not be parsed.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    /// The request never produced a response (connection, timeout, body read).
    #[error("Network error: {0}")]
    Network(String),
    /// The API returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The GraphQL endpoint answered 200 but reported errors instead of data.
    #[error("GraphQL errors: {}", messages.join("; "))]
    GraphQl { messages: Vec<String> },
    /// The body did not match the expected response schema.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl Error {
    /// HTTP status code, when the error came from a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when any GraphQL error message mentions one of `needles` (case-insensitive).
    pub fn graphql_mentions(&self, needles: &[&str]) -> bool {
        match self {
            Error::GraphQl { messages } => messages.iter().any(|m| {
                let lower = m.to_lowercase();
                needles.iter().any(|n| lower.contains(n))
            }),
            _ => false,
        }
    }
}
