use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Search sources with independent daily caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    X,
    Web,
}

impl SearchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Web => "web",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "x" => Self::X,
            _ => Self::Web,
        }
    }
}

/// Normalized search hit shared by both sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Stored payload of one search attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchLogPayload {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Append-only log of a search attempt, counted for daily caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLog {
    pub id: i64,
    pub agent_id: i64,
    pub date: NaiveDate,
    pub source: SearchSource,
    pub query: String,
    pub payload: SearchLogPayload,
    pub cost_estimate: Decimal,
}

/// Terminal state of a fetch attempt. `Skipped` rows are recorded for audit
/// but do not count against the daily fetch cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Skipped,
        }
    }
}

/// Structured summarizer output persisted alongside a fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSummary {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub confidence: String,
    pub safe_to_use: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Append-only log of one page-fetch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLog {
    pub id: i64,
    pub agent_id: i64,
    pub date: NaiveDate,
    pub url: String,
    pub status: FetchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<FetchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub cost_estimate: Decimal,
}

/// A harvested post from a followed handle, candidate target for reply and
/// quote drafts. Marked `used` once a draft consumes the URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPostCandidate {
    pub id: i64,
    pub agent_id: i64,
    pub date: NaiveDate,
    pub url: String,
    pub author_handle: String,
    pub text: String,
    pub post_created_at: DateTime<Utc>,
    pub used: bool,
}

/// A post surfaced by the target-post source adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPost {
    pub external_id: String,
    pub url: String,
    pub author_handle: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
