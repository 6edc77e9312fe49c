//! HTTP client for the Product Hunt GraphQL API (v2).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::{
    query::{PostsQuery, Query},
    types::{Connection, GraphQlResponse, Post, PostsData, TokenResponse},
    user_agent::{get_user_agent, DEFAULT_USER_AGENT},
    Error,
};

/// Token lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_TTL_SECS: u64 = 7200;

/// Client credentials issued for a Product Hunt API application.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// HTTP client for the Product Hunt GraphQL API.
///
/// Obtains a bearer token with the client-credentials grant on first use and
/// keeps it until 90% of its lifetime has elapsed or [`Client::invalidate_token`]
/// is called. With stealth enabled every request carries browser-like headers
/// and a rotated user agent.
pub struct Client {
    /// Base URL for the API. Defaults to `https://api.producthunt.com`.
    base_api_url: String,
    credentials: Credentials,
    http: reqwest::Client,
    stealth: bool,
    token: Mutex<Option<AccessToken>>,
}

impl Client {
    /// Creates a new client pointing at the production Product Hunt API.
    pub fn new(credentials: Credentials) -> Result<Self, Error> {
        Self::with_base_url("https://api.producthunt.com", credentials)
    }

    /// Creates a new client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str, credentials: Credentials) -> Result<Self, Error> {
        if credentials.client_id.trim().is_empty() || credentials.client_secret.trim().is_empty() {
            return Err(Error::MissingCredentials);
        }
        let base = url::Url::parse(base_url)
            .map_err(|e| Error::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed
            })?;
        Ok(Self {
            base_api_url: base.as_str().trim_end_matches('/').to_string(),
            credentials,
            http,
            stealth: true,
            token: Mutex::new(None),
        })
    }

    /// Enables or disables browser-like request headers.
    pub fn with_stealth(mut self, stealth: bool) -> Self {
        self.stealth = stealth;
        self
    }

    /// Requests a fresh access token, replacing any cached one.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let url = format!("{}/v2/oauth/token", self.base_api_url);
        let payload = serde_json::json!({
            "client_id": self.credentials.client_id,
            "client_secret": self.credentials.client_secret,
            "grant_type": "client_credentials",
        });
        let resp: TokenResponse = self.send(&url, &payload, None).await?;
        let ttl = resp.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let token = AccessToken {
            value: resp.access_token,
            expires_at: Instant::now() + Duration::from_secs_f64(ttl as f64 * 0.9),
        };
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token);
        tracing::info!("Authenticated with Product Hunt API");
        Ok(())
    }

    /// Drops the cached token so the next request re-authenticates.
    pub fn invalidate_token(&self) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Returns true if a non-expired token is cached.
    pub fn has_valid_token(&self) -> bool {
        self.cached_token().is_some()
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .filter(|t| Instant::now() < t.expires_at)
            .map(|t| t.value.clone())
    }

    async fn bearer(&self) -> Result<String, Error> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        self.authenticate().await?;
        self.cached_token().ok_or(Error::RequestFailed)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !self.stealth {
            headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
            return headers;
        }
        headers.insert(USER_AGENT, HeaderValue::from_static(get_user_agent()));
        headers.insert("accept-language", HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert("dnt", HeaderValue::from_static("1"));
        if rand::thread_rng().gen_bool(0.3) {
            headers.insert(REFERER, HeaderValue::from_static("https://www.producthunt.com/"));
        }
        headers
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<T, Error> {
        let mut req = self.http.post(url).headers(self.headers()).json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.map_err(|e| {
            tracing::error!("Failed to reach {}: {}", url, e);
            Error::Network(e.to_string())
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::Network(e.to_string())
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse resource: {} | body: {}", e, snippet);
            Error::Decode(e.to_string())
        })
    }

    async fn graphql<T, Q>(&self, query: &Q) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Query,
    {
        let token = self.bearer().await?;
        let url = format!("{}/v2/api/graphql", self.base_api_url);
        let resp: GraphQlResponse<T> = self
            .send(&url, &query.to_request_body(), Some(&token))
            .await?;
        if !resp.errors.is_empty() {
            let messages: Vec<String> = resp.errors.into_iter().map(|e| e.message).collect();
            tracing::error!("API returned errors: {:?}", messages);
            return Err(Error::GraphQl { messages });
        }
        resp.data
            .ok_or_else(|| Error::Decode("response carried neither data nor errors".to_string()))
    }

    /// Fetches one page of the `posts` connection.
    pub async fn get_posts(&self, query: &PostsQuery) -> Result<Connection<Post>, Error> {
        let data: PostsData = self.graphql(query).await?;
        Ok(data.posts)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(1500);
        let out = truncate_body(&body);
        assert!(out.ends_with("...[truncated]"));
    }

    #[test]
    fn empty_credentials_rejected() {
        let creds = Credentials {
            client_id: "id".into(),
            client_secret: " ".into(),
        };
        assert!(matches!(
            Client::with_base_url("http://localhost", creds),
            Err(Error::MissingCredentials)
        ));
    }

    #[test]
    fn invalid_base_url_rejected() {
        let creds = Credentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
        };
        assert!(matches!(
            Client::with_base_url("not a url", creds),
            Err(Error::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials {
            client_id: "id".into(),
            client_secret: "hunter2".into(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
