//! Fetch Client seam: one page-query per call, with upstream failures
//! mapped to the outcomes the pagination driver acts on.

use std::future::Future;

use chrono::{DateTime, Utc};
use producthunt_api::types::Post;
use producthunt_api::{Client, Query};

use crate::governor::FailureKind;
use crate::window::QueryWindow;

/// Typed outcome of a failed fetch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("authentication expired or rejected: {0}")]
    AuthExpired(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Backoff class for retryable failures, `None` otherwise.
    pub fn retry_kind(&self) -> Option<FailureKind> {
        match self {
            FetchError::RateLimited(_) => Some(FailureKind::RateLimited),
            FetchError::Transient(_) => Some(FailureKind::Transient),
            _ => None,
        }
    }
}

const AUTH_MARKERS: &[&str] = &[
    "unauthorized",
    "unauthenticated",
    "invalid_token",
    "access token",
    "forbidden",
];
const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate_limit", "too many requests", "complexity"];

impl From<producthunt_api::Error> for FetchError {
    fn from(err: producthunt_api::Error) -> Self {
        use producthunt_api::Error;

        let message = err.to_string();
        match &err {
            Error::HttpStatus { status, .. } => match *status {
                401 | 403 => FetchError::AuthExpired(message),
                429 => FetchError::RateLimited(message),
                408 => FetchError::Transient(message),
                s if s >= 500 => FetchError::Transient(message),
                _ => FetchError::Malformed(message),
            },
            Error::Network(_) => FetchError::Transient(message),
            Error::GraphQl { .. } if err.graphql_mentions(AUTH_MARKERS) => {
                FetchError::AuthExpired(message)
            }
            Error::GraphQl { .. } if err.graphql_mentions(RATE_LIMIT_MARKERS) => {
                FetchError::RateLimited(message)
            }
            Error::MissingCredentials => FetchError::AuthExpired(message),
            Error::GraphQl { .. }
            | Error::Decode(_)
            | Error::RequestFailed
            | Error::InvalidBaseUrl(_) => FetchError::Malformed(message),
        }
    }
}

/// One page of raw items and the cursor to continue from.
#[derive(Debug, Clone, Default)]
pub struct PostPage {
    pub items: Vec<Post>,
    /// `None` when the upstream reports no further page.
    pub next_cursor: Option<String>,
    pub total_count: Option<i64>,
}

/// Anything that can serve pages for a window. Implemented by the live API
/// client and by scripted sources in tests.
pub trait PageSource {
    fn fetch_page(
        &self,
        window: &QueryWindow,
        cursor: Option<&str>,
        limit: i64,
    ) -> impl Future<Output = Result<PostPage, FetchError>> + Send;

    /// Discards the current credentials and obtains fresh ones.
    fn reauthenticate(&self) -> impl Future<Output = Result<(), FetchError>> + Send;
}

/// [`PageSource`] backed by the Product Hunt API.
pub struct ApiPageSource {
    client: Client,
    reference_now: DateTime<Utc>,
}

impl ApiPageSource {
    /// `reference_now` anchors rolling leaderboard periods for the whole run.
    pub fn new(client: Client, reference_now: DateTime<Utc>) -> Self {
        Self {
            client,
            reference_now,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl PageSource for ApiPageSource {
    async fn fetch_page(
        &self,
        window: &QueryWindow,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<PostPage, FetchError> {
        let query = window
            .to_query(self.reference_now)
            .with_first(limit)
            .with_after(cursor);
        tracing::debug!(%window, cursor = cursor.unwrap_or(""), limit, "Fetching page");
        let connection = self.client.get_posts(&query).await?;
        let next_cursor = connection.next_cursor().map(str::to_string);
        let total_count = connection.total_count;
        Ok(PostPage {
            items: connection.into_nodes(),
            next_cursor,
            total_count,
        })
    }

    async fn reauthenticate(&self) -> Result<(), FetchError> {
        self.client.invalidate_token();
        self.client.authenticate().await.map_err(FetchError::from)
    }
}
