use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Short error payload recorded into analytics and audit rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Note attached to analytics when the circuit breaker fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoStopNote {
    pub reason: String,
    pub source: String,
}

/// Research block of the analytics summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSummary {
    pub count: usize,
    #[serde(default)]
    pub last_queries: Vec<String>,
    #[serde(default)]
    pub skipped: Vec<SkippedEntry>,
}

/// Fetch block of the analytics summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchSummaryBlock {
    pub processed: usize,
    #[serde(default)]
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub reason: String,
}

/// Typed analytics blob for an agent-day. Known fields are first-class;
/// unknown keys survive round-trips through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_metrics_created: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impressions_unavailable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchSummaryBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub posting_errors: Vec<ErrorPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_stop: Option<AutoStopNote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Check-phase verdict for the day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_fetch_failed: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Act-phase direction for the next day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to a post created by planning, kept in the PDCA trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedPostRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
}

/// Plan-Do-Check-Act artifact, upserted once per agent-day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPdca {
    pub id: i64,
    pub agent_id: i64,
    pub date: NaiveDate,
    pub analytics_summary: AnalyticsSummary,
    pub analysis: Analysis,
    pub strategy: Strategy,
    pub posts_created: Vec<CreatedPostRef>,
}

impl DailyPdca {
    /// Fresh artifact with empty blobs, not yet persisted.
    pub fn new(agent_id: i64, date: NaiveDate) -> Self {
        Self {
            id: 0,
            agent_id,
            date,
            analytics_summary: AnalyticsSummary::default(),
            analysis: Analysis::default(),
            strategy: Strategy::default(),
            posts_created: Vec::new(),
        }
    }

    /// Skip-shaped artifact used by the gate steps of the daily routine.
    pub fn skip(agent_id: i64, date: NaiveDate, reason: &str, next_action: &str) -> Self {
        let mut pdca = Self::new(agent_id, date);
        pdca.analytics_summary.status = Some("skip".to_string());
        pdca.analytics_summary.reason = Some(reason.to_string());
        pdca.analysis.status = Some("skipped".to_string());
        pdca.analysis.reason = Some(reason.to_string());
        pdca.strategy.next_action = Some(next_action.to_string());
        pdca
    }
}
