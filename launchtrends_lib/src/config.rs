//! Run configuration: credentials, retry tuning and pacing.
//!
//! Environment values are read through a lookup closure so callers (and
//! tests) decide where they come from.

use std::time::Duration;

use producthunt_api::Credentials;

/// Errors raised while validating parameters, before any network call.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("days must be at least 1, got {0}")]
    InvalidDays(i64),

    #[error("at least one leaderboard period is required")]
    NoPeriods,

    #[error("unknown leaderboard period '{0}' (expected today, week, month or year)")]
    UnknownPeriod(String),

    #[error("unknown timezone '{0}' (expected utc or pacific)")]
    UnknownTimezone(String),

    #[error("invalid delay range: min {min:?} exceeds max {max:?}")]
    InvalidDelayRange { min: Duration, max: Duration },

    #[error("probability must be between 0 and 1, got {0}")]
    InvalidProbability(f64),

    #[error("page size must be between 1 and {max}, got {got}")]
    InvalidPageSize { got: i64, max: i64 },
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_BASE_URL: &str = "https://api.producthunt.com";

/// Retry and backoff settings applied to every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Base used instead of `base_delay` when the upstream reports rate limiting.
    pub rate_limit_base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
            rate_limit_base_delay: Duration::from_millis(5000),
            max_delay: Duration::from_millis(30_000),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Applies `LAUNCHTRENDS_RETRY_*` overrides on top of the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(n) = parse_number::<u32, _>(&lookup, "LAUNCHTRENDS_RETRY_MAX")? {
            config.max_retries = n;
        }
        if let Some(ms) = parse_number::<u64, _>(&lookup, "LAUNCHTRENDS_RETRY_BASE_MS")? {
            config.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_number::<u64, _>(&lookup, "LAUNCHTRENDS_RATE_LIMIT_BASE_MS")? {
            config.rate_limit_base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_number::<u64, _>(&lookup, "LAUNCHTRENDS_RETRY_MAX_MS")? {
            config.max_delay = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

/// Pacing for the Rate Governor.
#[derive(Debug, Clone, PartialEq)]
pub struct GovernorConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub window_min_delay: Duration,
    pub window_max_delay: Duration,
    /// Chance of an idle pause after a successful request.
    pub idle_probability: f64,
    pub idle_min_delay: Duration,
    pub idle_max_delay: Duration,
    pub retry: RetryConfig,
}

impl GovernorConfig {
    /// Human-like pacing: 1-4 s before each request, 2-5 s between windows,
    /// and a 3-8 s idle pause after 15% of successful requests.
    pub fn stealth(retry: RetryConfig) -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            window_min_delay: Duration::from_secs(2),
            window_max_delay: Duration::from_secs(5),
            idle_probability: 0.15,
            idle_min_delay: Duration::from_secs(3),
            idle_max_delay: Duration::from_secs(8),
            retry,
        }
    }

    /// No pacing delays; backoff on failure still applies.
    pub fn unthrottled(retry: RetryConfig) -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            window_min_delay: Duration::ZERO,
            window_max_delay: Duration::ZERO,
            idle_probability: 0.0,
            idle_min_delay: Duration::ZERO,
            idle_max_delay: Duration::ZERO,
            retry,
        }
    }

    pub fn for_stealth(stealth: bool, retry: RetryConfig) -> Self {
        if stealth {
            Self::stealth(retry)
        } else {
            Self::unthrottled(retry)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvalidDelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if self.window_min_delay > self.window_max_delay {
            return Err(ConfigError::InvalidDelayRange {
                min: self.window_min_delay,
                max: self.window_max_delay,
            });
        }
        if self.idle_min_delay > self.idle_max_delay {
            return Err(ConfigError::InvalidDelayRange {
                min: self.idle_min_delay,
                max: self.idle_max_delay,
            });
        }
        if !(0.0..=1.0).contains(&self.idle_probability) {
            return Err(ConfigError::InvalidProbability(self.idle_probability));
        }
        Ok(())
    }
}

/// Reads `PH_CLIENT_ID` and `PH_CLIENT_SECRET`.
pub fn credentials_from_lookup<F>(lookup: F) -> Result<Credentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let client_id = require(&lookup, "PH_CLIENT_ID")?;
    let client_secret = require(&lookup, "PH_CLIENT_SECRET")?;
    Ok(Credentials {
        client_id,
        client_secret,
    })
}

/// Upstream base URL, overridable with `PRODUCTHUNT_BASE_URL`.
pub fn base_url_from_lookup<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("PRODUCTHUNT_BASE_URL")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Checks a requested page size against the upstream bounds.
pub fn validate_page_size(page_size: i64) -> Result<i64, ConfigError> {
    if (1..=MAX_PAGE_SIZE).contains(&page_size) {
        Ok(page_size)
    } else {
        Err(ConfigError::InvalidPageSize {
            got: page_size,
            max: MAX_PAGE_SIZE,
        })
    }
}

fn require<F>(lookup: &F, var: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
}

fn parse_number<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
    }
}
