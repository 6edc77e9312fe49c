//! Trend Aggregator: descriptive statistics over a collected launch table.
//!
//! Everything here is pure over a slice of [`LaunchRecord`]s apart from
//! [`save_analysis`], which writes the report files.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::record::LaunchRecord;
use crate::store::write_atomic;

pub const DEFAULT_TOP_N: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid classifier pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpvoteStats {
    pub average: f64,
    pub median: f64,
    pub max: i64,
    pub max_product: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicStats {
    pub total_products: usize,
    pub date_range: Option<DateRange>,
    pub upvotes: Option<UpvoteStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub products_count: usize,
    pub total_upvotes: i64,
    pub avg_upvotes: f64,
    pub median_upvotes: f64,
    pub max_upvotes: i64,
    pub total_comments: i64,
    pub avg_comments: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopProduct {
    #[serde(rename = "Product Name")]
    pub name: String,
    #[serde(rename = "Tagline")]
    pub tagline: String,
    #[serde(rename = "Launch Date")]
    pub launch_date: String,
    #[serde(rename = "Upvotes")]
    pub upvotes: i64,
    #[serde(rename = "Comments Count")]
    pub comments: i64,
    #[serde(rename = "Topics")]
    pub topics: String,
    #[serde(rename = "Website URL")]
    pub website_url: String,
}

impl From<&LaunchRecord> for TopProduct {
    fn from(r: &LaunchRecord) -> Self {
        Self {
            name: r.name.clone(),
            tagline: r.tagline.clone(),
            launch_date: r.launch_date.clone(),
            upvotes: r.upvotes,
            comments: r.comments,
            topics: r.topics.clone(),
            website_url: r.website_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Audience {
    B2B,
    B2C,
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub ai_related: bool,
    pub audience: Audience,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedProduct {
    pub name: String,
    pub launch_date: String,
    pub ai_related: bool,
    pub audience: Audience,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorySummary {
    pub total: usize,
    pub ai_related: usize,
    pub b2b: usize,
    pub b2c: usize,
    pub unclassified: usize,
    /// AI-related share of all products, in percent with two decimals.
    pub ai_share: f64,
    pub products: Vec<ClassifiedProduct>,
}

/// Keyword heuristics for AI relevance and audience.
#[derive(Debug, Clone)]
pub struct Classifier {
    ai: Regex,
    b2b: Regex,
    b2c: Regex,
}

const AI_PATTERN: &str = r"(?i)\b(ai|a\.i\.|artificial intelligence|machine learning|ml|llms?|gpt(-?\d+)?|chatgpt|openai|neural|deep learning|generative|genai|copilot|chatbots?|ai agents?)\b";
const B2B_PATTERN: &str = r"(?i)\b(b2b|saas|enterprise|teams?|developer tools?|developers?|apis?|crm|sales|marketing|analytics|workflows?|business(es)?|startups?|recruiting|hiring|devops|no-code|fintech|invoic(e|es|ing))\b";
const B2C_PATTERN: &str = r"(?i)\b(b2c|consumers?|personal|lifestyle|health|fitness|games?|gaming|social|music|travel|photography|entertainment|dating|shopping|kids|parents|family|home|wellness|meditation)\b";

impl Classifier {
    pub fn new() -> Result<Self, AnalysisError> {
        Ok(Self {
            ai: Regex::new(AI_PATTERN)?,
            b2b: Regex::new(B2B_PATTERN)?,
            b2c: Regex::new(B2C_PATTERN)?,
        })
    }

    /// AI if any keyword appears; audience by whichever keyword set hits more
    /// often, unclassified on a tie.
    pub fn classify(&self, record: &LaunchRecord) -> Classification {
        let text = format!(
            "{} {} {} {}",
            record.name, record.tagline, record.description, record.topics
        );
        let b2b = self.b2b.find_iter(&text).count();
        let b2c = self.b2c.find_iter(&text).count();
        let audience = match b2b.cmp(&b2c) {
            std::cmp::Ordering::Greater => Audience::B2B,
            std::cmp::Ordering::Less => Audience::B2C,
            std::cmp::Ordering::Equal => Audience::Unclassified,
        };
        Classification {
            ai_related: self.ai.is_match(&text),
            audience,
        }
    }
}

/// Everything the analyzer produces for one table.
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub basic: BasicStats,
    pub topics: Vec<TopicCount>,
    pub daily: Vec<DailyStats>,
    pub top_products: Vec<TopProduct>,
    pub categories: CategorySummary,
    /// Narrative analysis, when one was produced.
    pub narrative: Option<serde_json::Value>,
}

pub struct TrendAggregator<'a> {
    records: &'a [LaunchRecord],
    classifier: Classifier,
}

impl<'a> TrendAggregator<'a> {
    pub fn new(records: &'a [LaunchRecord]) -> Result<Self, AnalysisError> {
        Ok(Self {
            records,
            classifier: Classifier::new()?,
        })
    }

    pub fn basic_stats(&self) -> BasicStats {
        let dates: Vec<NaiveDate> = self.records.iter().filter_map(parse_date).collect();
        let date_range = match (dates.iter().min(), dates.iter().max()) {
            (Some(start), Some(end)) => Some(DateRange {
                start: start.format("%Y-%m-%d").to_string(),
                end: end.format("%Y-%m-%d").to_string(),
                days: (*end - *start).num_days() + 1,
            }),
            _ => None,
        };

        let upvotes = self
            .records
            .iter()
            .fold(None::<&LaunchRecord>, |best, r| match best {
                Some(b) if b.upvotes >= r.upvotes => Some(b),
                _ => Some(r),
            })
            .map(|top| {
                let votes: Vec<i64> = self.records.iter().map(|r| r.upvotes).collect();
                UpvoteStats {
                    average: round2(mean(&votes)),
                    median: median(&votes),
                    max: top.upvotes,
                    max_product: top.name.clone(),
                }
            });

        BasicStats {
            total_products: self.records.len(),
            date_range,
            upvotes,
        }
    }

    /// Topic counts, most frequent first, ties by name.
    pub fn topic_frequency(&self) -> Vec<TopicCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in self.records {
            for topic in record.topic_list() {
                *counts.entry(topic).or_default() += 1;
            }
        }
        let mut sorted: Vec<TopicCount> = counts
            .into_iter()
            .map(|(topic, count)| TopicCount {
                topic: topic.to_string(),
                count,
            })
            .collect();
        sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic.cmp(&b.topic)));
        sorted
    }

    /// Per-day statistics in date order. Records without a parseable date are skipped.
    pub fn daily_stats(&self) -> Vec<DailyStats> {
        let mut by_day: BTreeMap<NaiveDate, Vec<&LaunchRecord>> = BTreeMap::new();
        for record in self.records {
            if let Some(date) = parse_date(record) {
                by_day.entry(date).or_default().push(record);
            }
        }
        by_day
            .into_iter()
            .map(|(date, records)| {
                let votes: Vec<i64> = records.iter().map(|r| r.upvotes).collect();
                let comments: Vec<i64> = records.iter().map(|r| r.comments).collect();
                DailyStats {
                    date,
                    products_count: records.len(),
                    total_upvotes: votes.iter().sum(),
                    avg_upvotes: round2(mean(&votes)),
                    median_upvotes: median(&votes),
                    max_upvotes: votes.iter().copied().max().unwrap_or(0),
                    total_comments: comments.iter().sum(),
                    avg_comments: round2(mean(&comments)),
                }
            })
            .collect()
    }

    /// Top `n` records by upvotes. Ties keep table order.
    pub fn top_n(&self, n: usize) -> Vec<TopProduct> {
        let mut sorted: Vec<&LaunchRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.upvotes.cmp(&a.upvotes));
        sorted.into_iter().take(n).map(TopProduct::from).collect()
    }

    pub fn classify(&self, record: &LaunchRecord) -> Classification {
        self.classifier.classify(record)
    }

    pub fn category_summary(&self) -> CategorySummary {
        let mut summary = CategorySummary {
            total: self.records.len(),
            ..CategorySummary::default()
        };
        for record in self.records {
            let c = self.classify(record);
            if c.ai_related {
                summary.ai_related += 1;
            }
            match c.audience {
                Audience::B2B => summary.b2b += 1,
                Audience::B2C => summary.b2c += 1,
                Audience::Unclassified => summary.unclassified += 1,
            }
            summary.products.push(ClassifiedProduct {
                name: record.name.clone(),
                launch_date: record.launch_date.clone(),
                ai_related: c.ai_related,
                audience: c.audience,
            });
        }
        if summary.total > 0 {
            summary.ai_share = round2(summary.ai_related as f64 * 100.0 / summary.total as f64);
        }
        summary
    }

    pub fn report(&self, top_n: usize) -> TrendReport {
        let report = TrendReport {
            basic: self.basic_stats(),
            topics: self.topic_frequency(),
            daily: self.daily_stats(),
            top_products: self.top_n(top_n),
            categories: self.category_summary(),
            narrative: None,
        };
        tracing::info!(
            products = report.basic.total_products,
            topics = report.topics.len(),
            days = report.daily.len(),
            "Trend report computed"
        );
        report
    }
}

/// Writes the report files into `output_dir`, returning their paths.
pub fn save_analysis(report: &TrendReport, output_dir: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    fs::create_dir_all(output_dir).map_err(|e| AnalysisError::Io {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let narrative = report
        .narrative
        .clone()
        .unwrap_or_else(narrative_placeholder);

    let mut written = vec![
        write_json(output_dir, "basic_stats.json", &report.basic)?,
        write_json(output_dir, "topic_analysis.json", &report.topics)?,
        write_csv(output_dir, "daily_trends.csv", &report.daily)?,
        write_csv(output_dir, "top_products.csv", &report.top_products)?,
        write_json(output_dir, "categories.json", &report.categories)?,
    ];
    written.push(write_json(output_dir, "llm_trend_analysis.json", &narrative)?);
    tracing::info!(dir = %output_dir.display(), files = written.len(), "Analysis saved");
    Ok(written)
}

/// Stand-in written when no narrative is available.
pub fn narrative_placeholder() -> serde_json::Value {
    let missing = "No data available";
    serde_json::json!({
        "error": "LLM analysis not available",
        "trending_categories": missing,
        "emerging_categories": missing,
        "product_patterns": missing,
        "b2b_trends": missing,
        "b2c_trends": missing,
        "ai_trends": missing,
    })
}

fn write_json<T: Serialize + ?Sized>(
    dir: &Path,
    name: &str,
    value: &T,
) -> Result<PathBuf, AnalysisError> {
    let path = dir.join(name);
    let body = serde_json::to_vec_pretty(value)?;
    write_atomic(&path, |file| {
        use std::io::Write;
        file.write_all(&body).map_err(|e| crate::store::StoreError::Io {
            path: path.clone(),
            source: e,
        })
    })?;
    Ok(path)
}

fn write_csv<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<PathBuf, AnalysisError> {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| AnalysisError::Io {
            path: path.clone(),
            source: std::io::Error::new(e.error().kind(), e.error().to_string()),
        })?;
    write_atomic(&path, |file| {
        use std::io::Write;
        file.write_all(&body).map_err(|e| crate::store::StoreError::Io {
            path: path.clone(),
            source: e,
        })
    })?;
    Ok(path)
}

fn parse_date(record: &LaunchRecord) -> Option<NaiveDate> {
    let raw = record.launch_date.trim();
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
}

fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<i64>() as f64 / values.len() as f64
}

fn median(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
