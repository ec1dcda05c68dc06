use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported post shapes. `Reply` and `QuoteRt` require a target URL;
/// `Thread` carries its parts alongside the root content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Tweet,
    Thread,
    Reply,
    QuoteRt,
    Poll,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tweet => "tweet",
            Self::Thread => "thread",
            Self::Reply => "reply",
            Self::QuoteRt => "quote_rt",
            Self::Poll => "poll",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "thread" => Self::Thread,
            "reply" => Self::Reply,
            "quote_rt" => Self::QuoteRt,
            "poll" => Self::Poll,
            _ => Self::Tweet,
        }
    }

    pub fn is_engagement(&self) -> bool {
        matches!(self, Self::Reply | Self::QuoteRt)
    }
}

/// A scheduled or published post owned by one agent.
///
/// `posted_at` never reverts once set; `(agent_id, content_hash,
/// content_bucket_date)` is unique at the store level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub agent_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub content: String,
    pub post_type: PostType,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_post_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_parts: Option<Vec<String>>,
    #[serde(default)]
    pub allow_url: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_bucket_date: Option<NaiveDate>,
}

/// Fields of a post to be created; ids are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub agent_id: i64,
    pub external_id: Option<String>,
    pub content: String,
    pub post_type: PostType,
    pub media_urls: Vec<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub target_post_url: Option<String>,
    pub thread_parts: Option<Vec<String>>,
    pub allow_url: bool,
    pub content_hash: Option<String>,
    pub content_bucket_date: Option<NaiveDate>,
}

impl Default for PostType {
    fn default() -> Self {
        Self::Tweet
    }
}

/// Case- and whitespace-folded content used for duplicate detection.
/// Thread posts fold their parts; everything else folds the body.
pub fn normalize_post_content(content: &str, thread_parts: Option<&[String]>) -> String {
    let base = match thread_parts {
        Some(parts) if !parts.is_empty() => parts
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => content.to_string(),
    };
    base.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_lowercase()
}

/// SHA-256 of the normalized content, hex-encoded (64 chars).
pub fn build_post_content_hash(content: &str, thread_parts: Option<&[String]>) -> String {
    let normalized = normalize_post_content(content, thread_parts);
    let digest = Sha256::digest(normalized.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_case_and_whitespace() {
        assert_eq!(
            normalize_post_content("  Hello   World \n", None),
            "hello world"
        );
    }

    #[test]
    fn test_normalize_thread_joins_parts() {
        let parts = vec!["One ".to_string(), String::new(), " Two".to_string()];
        assert_eq!(normalize_post_content("ignored", Some(&parts)), "one two");
    }

    #[test]
    fn test_hash_is_stable_across_folding() {
        let a = build_post_content_hash("Same   Content", None);
        let b = build_post_content_hash("same content", None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_differs_for_different_content() {
        assert_ne!(
            build_post_content_hash("alpha", None),
            build_post_content_hash("beta", None)
        );
    }
}
