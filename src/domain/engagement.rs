use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engagement action kinds counted against the daily cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Like,
    Reply,
    QuoteRt,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Reply => "reply",
            Self::QuoteRt => "quote_rt",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "like" => Self::Like,
            "quote_rt" => Self::QuoteRt,
            _ => Self::Reply,
        }
    }
}

/// Append-only record of an executed engagement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementAction {
    pub id: i64,
    pub agent_id: i64,
    pub target_account_id: i64,
    pub action_type: ActionType,
    pub target_post_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub executed_at: DateTime<Utc>,
}
