//! The `scrape` subcommand: collect launches into the CSV tables.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use launchtrends_lib::config::{base_url_from_lookup, credentials_from_lookup, DEFAULT_PAGE_SIZE};
use launchtrends_lib::planner::parse_periods;
use launchtrends_lib::{
    persist, plan_windows, run_collection, ApiPageSource, Client, CollectionStore, Collector,
    GovernorConfig, PaginationConfig, PipelineError, RateGovernor, RetryConfig, Timezone,
    TokioSleeper, WindowPlan,
};
use tokio_util::sync::CancellationToken;

use crate::output::{print_run_summary, OutputFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// One window per calendar day
    Date,
    /// One window per leaderboard period
    Leaderboard,
}

/// Arguments for the `scrape` subcommand.
#[derive(Args)]
pub struct ScrapeArgs {
    /// Collection mode
    #[arg(long, value_enum, default_value = "date")]
    pub mode: Mode,

    /// Number of calendar days to collect, ending today (date mode)
    #[arg(long, default_value = "3")]
    pub days: i64,

    /// Comma-separated leaderboard periods: today, week, month, year (leaderboard mode)
    #[arg(long, default_value = "today")]
    pub periods: String,

    /// Maximum launches per window (0 = no limit)
    #[arg(long, default_value = "0")]
    pub limit: usize,

    /// Page size for API pagination (1-100)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: i64,

    /// Timezone that defines a calendar day: utc or pacific
    #[arg(long, default_value = "utc")]
    pub timezone: String,

    /// Disable browser-like headers and request pacing
    #[arg(long)]
    pub no_stealth: bool,

    /// Table of recently collected launches
    #[arg(long, default_value = "product_hunt_data.csv")]
    pub output: PathBuf,

    /// Long-running table that accumulates every run
    #[arg(long)]
    pub accumulate: Option<PathBuf>,
}

pub async fn run(
    args: &ScrapeArgs,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<ExitCode> {
    let lookup = |key: &str| std::env::var(key).ok();

    let timezone: Timezone = args.timezone.parse()?;
    let plan = match args.mode {
        Mode::Date => WindowPlan::Dates {
            days: args.days,
            timezone,
        },
        Mode::Leaderboard => WindowPlan::Leaderboard {
            periods: parse_periods(&args.periods)?,
        },
    };
    let now = Utc::now();
    let windows = plan_windows(&plan, now)?;
    let pagination = PaginationConfig::new(args.page_size, args.limit)?;
    let stealth = !args.no_stealth;
    let governor_config = GovernorConfig::for_stealth(stealth, RetryConfig::from_lookup(lookup)?);
    governor_config.validate()?;
    let credentials = credentials_from_lookup(lookup)?;

    let client = Client::with_base_url(&base_url_from_lookup(lookup), credentials)?
        .with_stealth(stealth);
    let mut collector = Collector::new(
        ApiPageSource::new(client, now),
        TokioSleeper,
        RateGovernor::new(governor_config),
        pagination,
        cancel,
    );

    eprintln!(
        "Collecting {} window(s) into {}",
        windows.len(),
        args.output.display()
    );

    let pb = ProgressBar::new(windows.len() as u64);
    if let Ok(style) =
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}/{len:3} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message("collecting...");

    let result = run_collection(&mut collector, &windows, timezone, |report| {
        pb.set_message(format!("{}: {}", report.window, report.outcome));
        pb.inc(1);
    })
    .await;
    pb.finish_and_clear();

    let collection = match result {
        Ok(collection) => collection,
        Err(PipelineError::Cancelled) => {
            tracing::warn!("Interrupted, no tables were written");
            return Ok(ExitCode::from(130));
        }
        Err(e) => return Err(e.into()),
    };

    print_run_summary(&collection.summary, format)?;

    if collection.summary.is_total_failure() {
        tracing::error!(
            "All {} window(s) failed, leaving tables untouched",
            collection.summary.attempted
        );
        return Ok(ExitCode::FAILURE);
    }

    let mut stores = vec![CollectionStore::new(&args.output)];
    if let Some(path) = &args.accumulate {
        stores.push(CollectionStore::new(path));
    }
    let outcomes = persist(&collection, &stores)?;
    for (store, outcome) in stores.iter().zip(&outcomes) {
        eprintln!(
            "{}: {} new, {} already present, {} total",
            store.path().display(),
            outcome.added,
            outcome.skipped,
            outcome.records.len()
        );
    }

    let summary = &collection.summary;
    eprintln!(
        "Windows: {} attempted, {} ok, {} empty, {} failed. Launches collected: {}",
        summary.attempted, summary.succeeded, summary.empty, summary.failed, summary.records_unique
    );
    Ok(ExitCode::SUCCESS)
}
