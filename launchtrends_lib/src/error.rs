//! Run-level error type for the collection pipeline.

use std::fmt;

use crate::config::ConfigError;
use crate::store::StoreError;

/// Errors that abort a whole run. Per-window fetch failures never surface
/// here; they are recorded in the run summary instead.
#[derive(Debug)]
pub enum PipelineError {
    /// Parameters or environment were invalid; raised before any network call.
    Config(ConfigError),
    /// Credentials were rejected and a single re-authentication did not help.
    Auth(String),
    /// Writing the destination table failed. The previous table is intact.
    Store(StoreError),
    /// An interrupt arrived; nothing was written.
    Cancelled,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::Auth(msg) => write!(f, "Authentication error: {}", msg),
            Self::Store(e) => write!(f, "Store error: {}", e),
            Self::Cancelled => write!(f, "Run cancelled before completion"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
