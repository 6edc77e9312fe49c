//! The `analyze` subcommand: trend statistics over a collected table.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Args;
use launchtrends_lib::analysis::DEFAULT_TOP_N;
use launchtrends_lib::{save_analysis, CollectionStore, NarrativeClient, TrendAggregator};

use crate::output::{print_daily, print_json, print_top_products, print_topics, OutputFormat};

/// Topics shown in the printed summary. The saved files contain all of them.
const PRINTED_TOPICS: usize = 15;

/// Arguments for the `analyze` subcommand.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Collected launch table to analyze
    #[arg(long, default_value = "product_hunt_data.csv")]
    pub input: PathBuf,

    /// Directory for the analysis files
    #[arg(long, default_value = "analysis")]
    pub output_dir: PathBuf,

    /// Number of top launches by upvotes
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top: usize,

    /// Skip the narrative summary even when GROQ_API_KEY is set
    #[arg(long)]
    pub no_narrative: bool,
}

pub async fn run(args: &AnalyzeArgs, format: OutputFormat) -> Result<ExitCode> {
    if !args.input.exists() {
        bail!("input table {} not found", args.input.display());
    }
    let records = CollectionStore::new(&args.input).load_strict()?;
    if records.is_empty() {
        tracing::warn!("{} has no launches", args.input.display());
    }

    let aggregator = TrendAggregator::new(&records)?;
    let mut report = aggregator.report(args.top);

    if !args.no_narrative {
        match NarrativeClient::from_lookup(|key| std::env::var(key).ok()) {
            Some(client) => report.narrative = client.generate(&report).await,
            None => tracing::info!("GROQ_API_KEY not set, skipping narrative analysis"),
        }
    }

    let written = save_analysis(&report, &args.output_dir)?;

    if format == OutputFormat::Json {
        print_json(&report);
    } else {
        let basic = &report.basic;
        println!("Launches: {}", basic.total_products);
        if let Some(range) = &basic.date_range {
            println!("Dates: {} to {} ({} days)", range.start, range.end, range.days);
        }
        if let Some(up) = &basic.upvotes {
            println!(
                "Upvotes: avg {:.2}, median {}, max {} ({})",
                up.average, up.median, up.max, up.max_product
            );
        }
        let categories = &report.categories;
        println!(
            "AI-related: {} ({:.2}%), B2B: {}, B2C: {}, unclassified: {}",
            categories.ai_related,
            categories.ai_share,
            categories.b2b,
            categories.b2c,
            categories.unclassified
        );
        println!();
        print_topics(&report.topics, PRINTED_TOPICS, format)?;
        println!();
        print_daily(&report.daily, format)?;
        println!();
        print_top_products(&report.top_products, format)?;
    }

    eprintln!(
        "Wrote {} files to {}",
        written.len(),
        args.output_dir.display()
    );
    Ok(ExitCode::SUCCESS)
}
