//! Pagination Driver: walks the cursor pages of one query window.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use producthunt_api::types::Post;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::{validate_page_size, ConfigError, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use crate::error::PipelineError;
use crate::fetch::{FetchError, PageSource};
use crate::governor::{RateGovernor, Sleeper};
use crate::window::QueryWindow;

/// Limits applied to each window.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationConfig {
    pub page_size: i64,
    /// Per-window item cap. `None` means unlimited.
    pub item_cap: Option<usize>,
    pub max_pages: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            item_cap: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl PaginationConfig {
    /// Validated settings with the default page ceiling. A `limit` of 0 means unlimited.
    pub fn new(page_size: i64, limit: usize) -> Result<Self, ConfigError> {
        let config = Self {
            page_size: validate_page_size(page_size)?,
            ..Self::default()
        }
        .with_limit(limit);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_page_size(self.page_size)?;
        Ok(())
    }

    /// Treats a `limit` of 0 as unlimited.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.item_cap = (limit > 0).then_some(limit);
        self
    }
}

/// Result of one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum WindowOutcome {
    Ok(usize),
    Empty,
    Failed(String),
}

impl fmt::Display for WindowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowOutcome::Ok(n) => write!(f, "ok({})", n),
            WindowOutcome::Empty => write!(f, "empty"),
            WindowOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Items gathered for one window and how the walk ended.
#[derive(Debug, Clone)]
pub struct WindowCollection {
    pub items: Vec<Post>,
    pub outcome: WindowOutcome,
    pub pages: usize,
    /// False when the walk stopped before the upstream reported the last page.
    pub complete: bool,
}

#[derive(Debug)]
enum FetchState {
    Pending,
    Fetching {
        cursor: Option<String>,
        attempt: u32,
    },
    BackingOff {
        cursor: Option<String>,
        attempt: u32,
        delay: Duration,
        error: FetchError,
    },
    Done {
        complete: bool,
    },
    Failed(FetchError),
}

/// Drives a [`PageSource`] across the pages of each window, pacing requests
/// through a [`RateGovernor`].
pub struct Collector<S, Z> {
    source: S,
    sleeper: Z,
    governor: RateGovernor,
    config: PaginationConfig,
    cancel: CancellationToken,
}

impl<S: PageSource, Z: Sleeper> Collector<S, Z> {
    pub fn new(
        source: S,
        sleeper: Z,
        governor: RateGovernor,
        config: PaginationConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            sleeper,
            governor,
            config,
            cancel,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// Collects every page of `window`.
    ///
    /// Only run-level conditions are errors: invalid settings, cancellation
    /// and credentials that stay rejected after one re-authentication.
    /// Everything else ends up in the returned outcome.
    pub async fn collect_window(
        &mut self,
        window: &QueryWindow,
    ) -> Result<WindowCollection, PipelineError> {
        self.config.validate()?;
        let mut items: Vec<Post> = Vec::new();
        let mut pages = 0usize;
        let mut seen_cursors: HashSet<String> = HashSet::new();
        let mut reauthenticated = false;
        let mut state = FetchState::Pending;

        loop {
            state = match state {
                FetchState::Pending => FetchState::Fetching {
                    cursor: None,
                    attempt: 0,
                },
                FetchState::Fetching { cursor, attempt } => {
                    let delay = self.governor.before_request();
                    self.pause(delay).await?;
                    if self.cancel.is_cancelled() {
                        return Err(PipelineError::Cancelled);
                    }

                    let limit = self.request_size(items.len());
                    let result = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                        r = self.source.fetch_page(window, cursor.as_deref(), limit) => r,
                    };

                    match result {
                        Ok(page) => {
                            self.governor.on_success();
                            if let Some(idle) = self.governor.after_success() {
                                tracing::debug!(idle_ms = idle.as_millis() as u64, "Idle pause");
                                self.pause(idle).await?;
                            }
                            reauthenticated = false;
                            pages += 1;
                            let received = page.items.len();
                            self.absorb(&mut items, page.items);
                            tracing::debug!(%window, page = pages, received, total = items.len(), "Page received");
                            self.next_state(window, cursor, page.next_cursor, received, &items, pages, &mut seen_cursors)
                        }
                        Err(FetchError::AuthExpired(msg)) => {
                            if reauthenticated {
                                tracing::error!(%window, "Credentials rejected after re-authentication: {}", msg);
                                return Err(PipelineError::Auth(msg));
                            }
                            reauthenticated = true;
                            tracing::warn!(%window, "Access token rejected, re-authenticating: {}", msg);
                            tokio::select! {
                                biased;
                                _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                                r = self.source.reauthenticate() => {
                                    r.map_err(|e| PipelineError::Auth(e.to_string()))?
                                }
                            }
                            FetchState::Fetching { cursor, attempt }
                        }
                        Err(error) => match error.retry_kind() {
                            Some(kind) if attempt < self.governor.max_retries() => {
                                let delay = self.governor.on_failure(attempt, kind);
                                FetchState::BackingOff {
                                    cursor,
                                    attempt,
                                    delay,
                                    error,
                                }
                            }
                            Some(_) => FetchState::Failed(FetchError::Exhausted {
                                attempts: attempt + 1,
                                last: Box::new(error),
                            }),
                            None => FetchState::Failed(error),
                        },
                    }
                }
                FetchState::BackingOff {
                    cursor,
                    attempt,
                    delay,
                    error,
                } => {
                    tracing::warn!(
                        %window,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, retrying: {}",
                        error
                    );
                    self.pause(delay).await?;
                    FetchState::Fetching {
                        cursor,
                        attempt: attempt + 1,
                    }
                }
                FetchState::Done { complete } => {
                    let outcome = if items.is_empty() {
                        WindowOutcome::Empty
                    } else {
                        WindowOutcome::Ok(items.len())
                    };
                    return Ok(WindowCollection {
                        items,
                        outcome,
                        pages,
                        complete,
                    });
                }
                FetchState::Failed(error) => {
                    let outcome = match &error {
                        FetchError::Exhausted { .. } if !items.is_empty() => {
                            tracing::warn!(
                                %window,
                                kept = items.len(),
                                "Pagination incomplete, keeping items gathered so far: {}",
                                error
                            );
                            WindowOutcome::Ok(items.len())
                        }
                        _ => {
                            tracing::warn!(%window, kept = items.len(), "Window failed: {}", error);
                            WindowOutcome::Failed(error.to_string())
                        }
                    };
                    return Ok(WindowCollection {
                        items,
                        outcome,
                        pages,
                        complete: false,
                    });
                }
            };
        }
    }

    /// Pacing delay between two windows.
    pub async fn pause_between_windows(&mut self) -> Result<(), PipelineError> {
        let delay = self.governor.between_windows();
        self.pause(delay).await
    }

    async fn pause(&self, delay: Duration) -> Result<(), PipelineError> {
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            _ = self.sleeper.sleep(delay) => Ok(()),
        }
    }

    fn request_size(&self, collected: usize) -> i64 {
        match self.config.item_cap {
            Some(cap) => {
                let remaining = cap.saturating_sub(collected) as i64;
                remaining.clamp(1, self.config.page_size.max(1))
            }
            None => self.config.page_size,
        }
    }

    fn absorb(&self, items: &mut Vec<Post>, page: Vec<Post>) {
        match self.config.item_cap {
            Some(cap) => {
                let room = cap.saturating_sub(items.len());
                items.extend(page.into_iter().take(room));
            }
            None => items.extend(page),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn next_state(
        &self,
        window: &QueryWindow,
        cursor: Option<String>,
        next: Option<String>,
        received: usize,
        items: &[Post],
        pages: usize,
        seen_cursors: &mut HashSet<String>,
    ) -> FetchState {
        if let Some(cap) = self.config.item_cap {
            if items.len() >= cap {
                tracing::debug!(%window, cap, "Item cap reached");
                return FetchState::Done { complete: true };
            }
        }
        let Some(next) = next else {
            return FetchState::Done { complete: true };
        };
        if received == 0 {
            tracing::warn!(%window, "Empty page with a continuation cursor, stopping");
            return FetchState::Done { complete: false };
        }
        if cursor.as_deref() == Some(next.as_str()) || !seen_cursors.insert(next.clone()) {
            tracing::warn!(%window, cursor = %next, "Cursor repeated, stopping pagination");
            return FetchState::Done { complete: false };
        }
        if pages >= self.config.max_pages {
            tracing::warn!(%window, max_pages = self.config.max_pages, "Page ceiling reached, stopping pagination");
            return FetchState::Done { complete: false };
        }
        FetchState::Fetching {
            cursor: Some(next),
            attempt: 0,
        }
    }
}
