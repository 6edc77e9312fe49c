//! Optional narrative summary from an OpenAI-compatible chat-completions API.
//!
//! Any failure here yields no narrative. The analysis never fails because of it.

use std::time::Duration;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analysis::TrendReport;

/// Request timeout for narrative calls (seconds).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const PRIMARY_MODEL: &str = "llama3-70b-8192";
pub const FALLBACK_MODEL: &str = "llama3-8b-8192";

const SYSTEM_PROMPT: &str = "You are a data analyst specializing in tech industry trends.";

/// Errors from a single completion call.
#[derive(thiserror::Error, Debug)]
pub enum NarrativeError {
    #[error("Invalid API key (HTTP {0})")]
    InvalidApiKey(u16),
    #[error("Request failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    ParseFailed(String),
    #[error("Response contained no completion")]
    EmptyCompletion,
    #[error("Network error")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the narrative service.
pub struct NarrativeClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    models: Vec<String>,
}

impl NarrativeClient {
    /// Builds a client from `GROQ_API_KEY` and `GROQ_BASE_URL`. Returns `None`
    /// when no key is configured.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup("GROQ_API_KEY")
            .map(|k| decode_api_key(&k))
            .filter(|k| !k.is_empty())?;
        let base = lookup("GROQ_BASE_URL")
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string());
        match Self::with_base_url(&base, key) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("Narrative client unavailable: {}", e);
                None
            }
        }
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: &str, api_key: String) -> Result<Self, NarrativeError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            models: vec![PRIMARY_MODEL.to_string(), FALLBACK_MODEL.to_string()],
        })
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Asks for a narrative over `report`, trying each model in turn.
    pub async fn generate(&self, report: &TrendReport) -> Option<Value> {
        let prompt = build_prompt(report);
        for model in &self.models {
            match self.complete(model, &prompt).await {
                Ok(text) => {
                    tracing::info!(model = %model, "Narrative analysis completed");
                    return Some(parse_narrative(&text));
                }
                Err(e) => tracing::warn!(model = %model, "Narrative request failed: {}", e),
            }
        }
        None
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, NarrativeError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.1,
            max_tokens: 2000,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(NarrativeError::InvalidApiKey(status.as_u16()));
        } else if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(NarrativeError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| NarrativeError::ParseFailed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(NarrativeError::EmptyCompletion)
    }
}

/// Keys pasted from URL-encoded sources arrive percent-encoded.
pub fn decode_api_key(raw: &str) -> String {
    percent_decode_str(raw.trim())
        .decode_utf8()
        .map(|k| k.into_owned())
        .unwrap_or_else(|_| raw.trim().to_string())
}

/// Compact aggregate summary sent to the model: top 30 topics and top 20 products.
pub fn build_prompt(report: &TrendReport) -> String {
    let topics: serde_json::Map<String, Value> = report
        .topics
        .iter()
        .take(30)
        .map(|t| (t.topic.clone(), json!(t.count)))
        .collect();
    let products: Vec<Value> = report
        .top_products
        .iter()
        .take(20)
        .map(|p| {
            json!({
                "Product Name": p.name,
                "Tagline": p.tagline,
                "Upvotes": p.upvotes,
                "Topics": p.topics,
            })
        })
        .collect();
    let pretty = |v: &Value| serde_json::to_string_pretty(v).unwrap_or_default();

    format!(
        "Analyze the following Product Hunt data to identify key trends, booming categories and patterns.\n\n\
         TOPICS BY FREQUENCY (top 30):\n{}\n\n\
         TOP PRODUCTS (by upvotes):\n{}\n\n\
         Respond with a JSON object with the keys \"trending_categories\", \"emerging_categories\", \
         \"product_patterns\", \"b2b_trends\", \"b2c_trends\" and \"ai_trends\".",
        pretty(&Value::Object(topics)),
        pretty(&Value::Array(products)),
    )
}

/// Extracts the outermost JSON object from the reply, or wraps the raw text.
pub fn parse_narrative(text: &str) -> Value {
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return value;
            }
        }
    }
    json!({ "raw_analysis": text })
}
