mod commands;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use launchtrends_lib::PipelineError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "launchtrends")]
#[command(about = "Collect Product Hunt launches and analyze launch trends")]
struct Cli {
    /// Output format for printed summaries
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect launches into the CSV tables
    Scrape(commands::scrape::ScrapeArgs),
    /// Compute trend statistics over a collected table
    Analyze(commands::analyze::AnalyzeArgs),
}

fn init_logging() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "launchtrends=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping");
            interrupt.cancel();
        }
    });

    let result = match &cli.command {
        Commands::Scrape(args) => commands::scrape::run(args, cli.format, cancel).await,
        Commands::Analyze(args) => commands::analyze::run(args, cli.format).await,
    };

    match result {
        Ok(code) => code,
        Err(e) if matches!(e.downcast_ref::<PipelineError>(), Some(PipelineError::Cancelled)) => {
            ExitCode::from(130)
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
