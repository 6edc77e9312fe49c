use anyhow::Result;
use clap::ValueEnum;
use launchtrends_lib::analysis::{DailyStats, TopProduct, TopicCount};
use launchtrends_lib::{RunSummary, WindowReport};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

#[derive(Tabled, Serialize)]
struct WindowRow {
    #[tabled(rename = "Window")]
    #[serde(rename = "Window")]
    window: String,
    #[tabled(rename = "Outcome")]
    #[serde(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Fetched")]
    #[serde(rename = "Fetched")]
    fetched: usize,
    #[tabled(rename = "New")]
    #[serde(rename = "New")]
    added: usize,
    #[tabled(rename = "Pages")]
    #[serde(rename = "Pages")]
    pages: usize,
}

#[derive(Tabled, Serialize)]
struct TopicRow {
    #[tabled(rename = "Topic")]
    #[serde(rename = "Topic")]
    topic: String,
    #[tabled(rename = "Products")]
    #[serde(rename = "Products")]
    count: usize,
}

#[derive(Tabled, Serialize)]
struct TopProductRow {
    #[tabled(rename = "#")]
    #[serde(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Product")]
    #[serde(rename = "Product")]
    name: String,
    #[tabled(rename = "Launch Date")]
    #[serde(rename = "Launch Date")]
    launch_date: String,
    #[tabled(rename = "Upvotes")]
    #[serde(rename = "Upvotes")]
    upvotes: i64,
    #[tabled(rename = "Comments")]
    #[serde(rename = "Comments")]
    comments: i64,
    #[tabled(rename = "Topics")]
    #[serde(rename = "Topics")]
    topics: String,
}

#[derive(Tabled, Serialize)]
struct DailyRow {
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    date: String,
    #[tabled(rename = "Launches")]
    #[serde(rename = "Launches")]
    products: usize,
    #[tabled(rename = "Upvotes")]
    #[serde(rename = "Upvotes")]
    total_upvotes: i64,
    #[tabled(rename = "Avg Upvotes")]
    #[serde(rename = "Avg Upvotes")]
    avg_upvotes: String,
    #[tabled(rename = "Top Upvotes")]
    #[serde(rename = "Top Upvotes")]
    max_upvotes: i64,
}

// -- Row builders --

fn build_window_rows(windows: &[WindowReport]) -> Vec<WindowRow> {
    windows
        .iter()
        .map(|w| WindowRow {
            window: w.window.clone(),
            outcome: if w.complete || !matches!(w.outcome, launchtrends_lib::WindowOutcome::Ok(_)) {
                w.outcome.to_string()
            } else {
                format!("{} (partial)", w.outcome)
            },
            fetched: w.fetched,
            added: w.added,
            pages: w.pages,
        })
        .collect()
}

fn build_topic_rows(topics: &[TopicCount], limit: usize) -> Vec<TopicRow> {
    topics
        .iter()
        .take(limit)
        .map(|t| TopicRow {
            topic: t.topic.clone(),
            count: t.count,
        })
        .collect()
}

fn build_top_product_rows(products: &[TopProduct]) -> Vec<TopProductRow> {
    products
        .iter()
        .enumerate()
        .map(|(i, p)| TopProductRow {
            rank: i + 1,
            name: p.name.clone(),
            launch_date: p.launch_date.clone(),
            upvotes: p.upvotes,
            comments: p.comments,
            topics: truncate(&p.topics, 40),
        })
        .collect()
}

fn build_daily_rows(daily: &[DailyStats]) -> Vec<DailyRow> {
    daily
        .iter()
        .map(|d| DailyRow {
            date: d.date.format("%Y-%m-%d").to_string(),
            products: d.products_count,
            total_upvotes: d.total_upvotes,
            avg_upvotes: format!("{:.2}", d.avg_upvotes),
            max_upvotes: d.max_upvotes,
        })
        .collect()
}

// -- Rendering --

fn render<T: Tabled + Serialize>(rows: Vec<T>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Markdown => {
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            println!("{}", table);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => print_json(&rows),
    }
    Ok(())
}

/// Prints the per-window table of a scrape run. JSON prints the whole summary.
pub fn print_run_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        print_json(summary);
        return Ok(());
    }
    render(build_window_rows(&summary.windows), format)
}

pub fn print_topics(topics: &[TopicCount], limit: usize, format: OutputFormat) -> Result<()> {
    render(build_topic_rows(topics, limit), format)
}

pub fn print_top_products(products: &[TopProduct], format: OutputFormat) -> Result<()> {
    render(build_top_product_rows(products), format)
}

pub fn print_daily(daily: &[DailyStats], format: OutputFormat) -> Result<()> {
    render(build_daily_rows(daily), format)
}

// -- JSON output --

pub fn print_json<T: serde::Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
