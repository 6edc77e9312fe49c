//! Library layer for Launch Trends: paced, paginated collection of Product Hunt
//! launches into a deduplicated CSV table, plus trend analysis over that table.
//!
//! Wraps the `producthunt_api` crate with a rate governor, a retrying
//! pagination driver, record normalization, atomic table persistence and
//! descriptive statistics.

pub mod analysis;
pub mod config;
pub mod error;
pub mod fetch;
pub mod governor;
pub mod narrative;
pub mod normalize;
pub mod pagination;
pub mod pipeline;
pub mod planner;
pub mod record;
pub mod store;
pub mod window;

#[cfg(test)]
mod testing;

pub use producthunt_api;
pub use producthunt_api::types;
pub use producthunt_api::{Client, Credentials};

pub use analysis::{save_analysis, TrendAggregator, TrendReport};
pub use config::{ConfigError, GovernorConfig, RetryConfig};
pub use error::PipelineError;
pub use fetch::{ApiPageSource, FetchError, PageSource, PostPage};
pub use governor::{RateGovernor, Sleeper, TokioSleeper};
pub use narrative::NarrativeClient;
pub use pagination::{Collector, PaginationConfig, WindowCollection, WindowOutcome};
pub use pipeline::{persist, run_collection, Collection, RunSummary, WindowReport};
pub use planner::{plan_windows, WindowPlan};
pub use record::{LaunchRecord, COLUMNS};
pub use store::{merge, CollectionStore, MergeOutcome, RecordSet, StoreError};
pub use window::{LeaderboardPeriod, QueryWindow, Timezone};
