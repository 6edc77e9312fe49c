//! Run pipeline: windows through the collector into a deduplicated record set.

use serde::Serialize;

use crate::error::PipelineError;
use crate::fetch::PageSource;
use crate::governor::Sleeper;
use crate::normalize::normalize;
use crate::pagination::{Collector, WindowOutcome};
use crate::store::{CollectionStore, MergeOutcome, RecordSet};
use crate::window::{QueryWindow, Timezone};

/// What happened to one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowReport {
    pub window: String,
    pub outcome: WindowOutcome,
    /// Items returned by the upstream for this window.
    pub fetched: usize,
    /// Records not already collected earlier in the run.
    pub added: usize,
    pub pages: usize,
    pub complete: bool,
}

/// Per-run totals. Always produced, whatever the outcome of individual windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub windows: Vec<WindowReport>,
    pub attempted: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub failed: usize,
    pub records_fetched: usize,
    pub records_unique: usize,
}

impl RunSummary {
    fn record(&mut self, report: WindowReport) {
        self.attempted += 1;
        match report.outcome {
            WindowOutcome::Ok(_) => self.succeeded += 1,
            WindowOutcome::Empty => self.empty += 1,
            WindowOutcome::Failed(_) => self.failed += 1,
        }
        self.records_fetched += report.fetched;
        self.records_unique += report.added;
        self.windows.push(report);
    }

    /// True when windows were attempted and none ended ok or empty.
    pub fn is_total_failure(&self) -> bool {
        self.attempted > 0 && self.succeeded == 0 && self.empty == 0
    }
}

/// Records gathered by a run plus its summary.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub records: RecordSet,
    pub summary: RunSummary,
}

/// Collects every window in order, normalizing and deduplicating as it goes.
///
/// `on_window` is called after each window with its report. Window failures
/// are recorded and the run moves on; only cancellation and unrecoverable
/// authentication stop it.
pub async fn run_collection<S, Z, F>(
    collector: &mut Collector<S, Z>,
    windows: &[QueryWindow],
    default_timezone: Timezone,
    mut on_window: F,
) -> Result<Collection, PipelineError>
where
    S: PageSource,
    Z: Sleeper,
    F: FnMut(&WindowReport),
{
    let mut collection = Collection::default();

    for (index, window) in windows.iter().enumerate() {
        if index > 0 {
            collector.pause_between_windows().await?;
        }
        tracing::info!(%window, "Collecting window {}/{}", index + 1, windows.len());

        let gathered = collector.collect_window(window).await?;
        let timezone = window.timezone().unwrap_or(default_timezone);
        let fetched = gathered.items.len();
        let added = collection
            .records
            .extend(gathered.items.iter().map(|post| normalize(post, timezone)));

        let report = WindowReport {
            window: window.to_string(),
            outcome: gathered.outcome,
            fetched,
            added,
            pages: gathered.pages,
            complete: gathered.complete,
        };
        match &report.outcome {
            WindowOutcome::Failed(reason) => {
                tracing::warn!(%window, "Window failed: {}", reason)
            }
            outcome => tracing::info!(%window, %outcome, added, "Window finished"),
        }
        on_window(&report);
        collection.summary.record(report);
    }

    let summary = &collection.summary;
    tracing::info!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        empty = summary.empty,
        failed = summary.failed,
        records = summary.records_unique,
        "Collection finished"
    );
    Ok(collection)
}

/// Merges the collected records into each destination table.
pub fn persist(
    collection: &Collection,
    stores: &[CollectionStore],
) -> Result<Vec<MergeOutcome>, PipelineError> {
    stores
        .iter()
        .map(|store| {
            store
                .merge_and_save(collection.records.records().to_vec())
                .map_err(PipelineError::from)
        })
        .collect()
}
