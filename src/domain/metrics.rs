use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::post::PostType;

/// Snapshot rows are transient; confirmed rows are platform-authoritative
/// (available roughly 48 hours after posting) and append-once per post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsCollectionType {
    Snapshot,
    Confirmed,
}

impl MetricsCollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Confirmed => "confirmed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "confirmed" => Self::Confirmed,
            _ => Self::Snapshot,
        }
    }
}

/// Stored engagement counters for one collection of one post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMetrics {
    pub id: i64,
    pub post_id: i64,
    pub collection_type: MetricsCollectionType,
    pub collected_at: DateTime<Utc>,
    pub impressions: i64,
    pub engagements: i64,
    pub likes: i64,
    pub retweets: i64,
    pub replies: i64,
    pub clicks: i64,
}

/// A post as reported by the external platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalPost {
    pub external_id: String,
    pub posted_at: DateTime<Utc>,
    pub text: String,
    pub post_type: PostType,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

/// Counters for an external post as reported by the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalPostMetrics {
    pub external_id: String,
    #[serde(default)]
    pub impressions: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub replies: i64,
    #[serde(default)]
    pub retweets: i64,
    #[serde(default)]
    pub clicks: i64,
    /// Set when the platform reported no impression counters at all.
    #[serde(default)]
    pub impressions_unavailable: bool,
}

impl ExternalPostMetrics {
    pub fn engagements(&self) -> i64 {
        self.likes + self.replies + self.retweets + self.clicks
    }
}

/// One day of platform usage units plus the raw endpoint payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyUsage {
    pub usage_date: NaiveDate,
    pub units: i64,
    pub raw: Value,
}
