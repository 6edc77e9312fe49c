//! Rate Governor: request pacing and failure backoff.

use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GovernorConfig;

/// Failure classes that earn a backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Transient,
}

/// Decides how long to wait before each request and after each failure.
///
/// Holds no state beyond the current run: a seedable RNG, the count of
/// consecutive failures and the last backoff handed out in that streak.
#[derive(Debug)]
pub struct RateGovernor {
    config: GovernorConfig,
    rng: StdRng,
    failure_streak: u32,
    last_backoff: Option<Duration>,
}

impl RateGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
            failure_streak: 0,
            last_backoff: None,
        }
    }

    /// Deterministic governor for tests.
    pub fn with_seed(config: GovernorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            failure_streak: 0,
            last_backoff: None,
        }
    }

    /// Delay before the next outbound request, uniform in `[min_delay, max_delay]`.
    pub fn before_request(&mut self) -> Duration {
        let (min, max) = (self.config.min_delay, self.config.max_delay);
        self.uniform(min, max)
    }

    /// Delay between two windows, uniform in `[window_min_delay, window_max_delay]`.
    pub fn between_windows(&mut self) -> Duration {
        let (min, max) = (self.config.window_min_delay, self.config.window_max_delay);
        self.uniform(min, max)
    }

    /// Occasional idle pause after a successful request, drawn with
    /// probability `idle_probability` from `[idle_min_delay, idle_max_delay]`.
    pub fn after_success(&mut self) -> Option<Duration> {
        let p = self.config.idle_probability;
        if p.is_nan() || p <= 0.0 {
            return None;
        }
        if !self.rng.gen_bool(p.min(1.0)) {
            return None;
        }
        let (min, max) = (self.config.idle_min_delay, self.config.idle_max_delay);
        Some(self.uniform(min, max))
    }

    /// Backoff after failed attempt number `attempt` (0-based):
    /// `base * 2^attempt`, jittered by `[0.8, 1.2)` when enabled, capped at `max_delay`.
    ///
    /// Within one failure streak the result never shrinks: each backoff is at
    /// least twice the previous one (up to the cap), whatever the failure kind.
    pub fn on_failure(&mut self, attempt: u32, kind: FailureKind) -> Duration {
        self.failure_streak = self.failure_streak.saturating_add(1);
        let retry = &self.config.retry;
        let base = match kind {
            FailureKind::RateLimited => retry.rate_limit_base_delay,
            FailureKind::Transient => retry.base_delay,
        };
        let jitter = if retry.jitter {
            self.rng.gen_range(0.8..1.2)
        } else {
            1.0
        };
        let mut nominal = base.as_secs_f64() * 2f64.powi(attempt.min(62) as i32) * jitter;
        if let Some(previous) = self.last_backoff {
            nominal = nominal.max(previous.as_secs_f64() * 2.0);
        }
        let delay = Duration::from_secs_f64(nominal.min(retry.max_delay.as_secs_f64()));
        self.last_backoff = Some(delay);
        tracing::debug!(
            attempt,
            ?kind,
            delay_ms = delay.as_millis() as u64,
            "Backing off"
        );
        delay
    }

    pub fn on_success(&mut self) {
        self.failure_streak = 0;
        self.last_backoff = None;
    }

    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    pub fn max_retries(&self) -> u32 {
        self.config.retry.max_retries
    }

    fn uniform(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let nanos = self
            .rng
            .gen_range(min.as_nanos() as u64..=max.as_nanos() as u64);
        Duration::from_nanos(nanos)
    }
}

/// Source of suspension between requests. Injected so tests run without real delays.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
