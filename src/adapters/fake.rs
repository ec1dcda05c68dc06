//! Deterministic fakes for every adapter seam.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    PlatformClient, Poster, SearchClient, Summarizer, TargetPostSource, UsageClient,
};
use crate::domain::{
    DailyUsage, ExternalPost, ExternalPostMetrics, FetchSummary, PostType, Result, SearchResult,
    TargetPost,
};

/// Platform observer yielding three posts per agent-day with metrics seeded
/// from the external id, so re-runs see identical data.
#[derive(Default)]
pub struct FakePlatformClient;

#[async_trait]
impl PlatformClient for FakePlatformClient {
    async fn resolve_user_id(&self) -> Result<String> {
        Ok("fake-user-id".to_string())
    }

    async fn list_posts(
        &self,
        agent_id: i64,
        target_date: NaiveDate,
    ) -> Result<Vec<ExternalPost>> {
        let base = Utc
            .from_utc_datetime(&target_date.and_hms_opt(9, 0, 0).expect("valid time"));
        Ok(vec![
            ExternalPost {
                external_id: format!("{agent_id}-{target_date}-001"),
                posted_at: base,
                text: "Daily update alpha".to_string(),
                post_type: PostType::Tweet,
                media_urls: Vec::new(),
            },
            ExternalPost {
                external_id: format!("{agent_id}-{target_date}-002"),
                posted_at: base + chrono::Duration::hours(2),
                text: "Daily update beta".to_string(),
                post_type: PostType::Thread,
                media_urls: vec!["https://example.com/image1.png".to_string()],
            },
            ExternalPost {
                external_id: format!("{agent_id}-{target_date}-003"),
                posted_at: base + chrono::Duration::hours(4),
                text: "Daily update gamma".to_string(),
                post_type: PostType::QuoteRt,
                media_urls: Vec::new(),
            },
        ])
    }

    async fn get_post_metrics(&self, post: &ExternalPost) -> Result<ExternalPostMetrics> {
        let seed: i64 = post.external_id.bytes().map(i64::from).sum();
        let likes = 10 + seed % 50;
        let replies = 2 + seed % 8;
        let retweets = 3 + seed % 12;
        let clicks = 15 + seed % 60;
        Ok(ExternalPostMetrics {
            external_id: post.external_id.clone(),
            impressions: likes * 20 + replies * 30 + retweets * 25 + clicks * 10,
            likes,
            replies,
            retweets,
            clicks,
            impressions_unavailable: false,
        })
    }

    async fn get_daily_usage(&self, usage_date: NaiveDate) -> Result<DailyUsage> {
        Ok(DailyUsage {
            usage_date,
            units: 0,
            raw: serde_json::json!({"source": "fake"}),
        })
    }
}

/// Poster assigning counter-based external ids; the counter doubles as the
/// publish-call count for at-most-once assertions.
#[derive(Default)]
pub struct FakePoster {
    calls: AtomicUsize,
}

impl FakePoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fake_id(&self, agent_id: i64, post_type: &str) -> String {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        format!("fake-{post_type}-{agent_id}-{n}")
    }
}

#[async_trait]
impl Poster for FakePoster {
    async fn post_text(&self, agent_id: i64, _text: &str) -> Result<String> {
        Ok(self.fake_id(agent_id, "tweet"))
    }

    async fn post_thread(&self, agent_id: i64, _parts: &[String]) -> Result<String> {
        Ok(self.fake_id(agent_id, "thread"))
    }

    async fn post_reply(
        &self,
        agent_id: i64,
        _target_post_url: &str,
        _text: &str,
    ) -> Result<String> {
        Ok(self.fake_id(agent_id, "reply"))
    }

    async fn post_quote_rt(
        &self,
        agent_id: i64,
        _target_post_url: &str,
        _text: &str,
    ) -> Result<String> {
        Ok(self.fake_id(agent_id, "quote"))
    }
}

/// Two canned web hits per query.
#[derive(Default)]
pub struct FakeWebSearchClient;

#[async_trait]
impl SearchClient for FakeWebSearchClient {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let base = vec![
            SearchResult {
                title: "Daily market pulse".to_string(),
                snippet: format!("Summary for {query} from trusted web source."),
                url: "https://example.com/research/market-pulse".to_string(),
            },
            SearchResult {
                title: "Industry watch".to_string(),
                snippet: format!("Signals and context around {query}."),
                url: "https://example.com/research/industry-watch".to_string(),
            },
        ];
        Ok(base.into_iter().take(k).collect())
    }
}

/// Two canned platform conversations per query.
#[derive(Default)]
pub struct FakeXSearchClient;

#[async_trait]
impl SearchClient for FakeXSearchClient {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let base = vec![
            SearchResult {
                title: format!("Conversation spike about {query}"),
                snippet: format!("Conversation spike about {query}"),
                url: "https://x.com/example/status/1".to_string(),
            },
            SearchResult {
                title: format!("User sentiment around {query}"),
                snippet: format!("User sentiment around {query}"),
                url: "https://x.com/example/status/2".to_string(),
            },
        ];
        Ok(base.into_iter().take(k).collect())
    }
}

/// Two recent posts per configured handle, ids stable per handle.
#[derive(Default)]
pub struct FakeTargetPostSource;

#[async_trait]
impl TargetPostSource for FakeTargetPostSource {
    async fn list_target_posts(
        &self,
        _agent_id: i64,
        handles: &[String],
        limit: usize,
    ) -> Result<Vec<TargetPost>> {
        let mut posts = Vec::new();
        for handle in handles {
            let normalized = handle.trim_start_matches('@').trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            for post_idx in 1..=2 {
                let external_id = format!("{normalized}-{post_idx:03}");
                posts.push(TargetPost {
                    url: format!("https://x.com/{normalized}/status/{external_id}"),
                    external_id,
                    author_handle: normalized.clone(),
                    text: format!("Recent post {post_idx} from {normalized}"),
                    created_at: Utc::now(),
                });
                if posts.len() >= limit {
                    return Ok(posts);
                }
            }
        }
        Ok(posts)
    }
}

/// Summarizer echoing a clipped version of the input.
#[derive(Default)]
pub struct FakeSummarizer;

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, extracted_text: &str) -> Result<FetchSummary> {
        let clipped: String = extracted_text.chars().take(120).collect();
        Ok(FetchSummary {
            summary: format!("Summary: {clipped}"),
            key_points: vec![clipped],
            confidence: "med".to_string(),
            safe_to_use: true,
            extra: Default::default(),
        })
    }
}

/// Fixed usage units for reconcile tests.
pub struct FakeUsageClient {
    pub units: i64,
}

impl Default for FakeUsageClient {
    fn default() -> Self {
        Self { units: 0 }
    }
}

#[async_trait]
impl UsageClient for FakeUsageClient {
    async fn fetch_daily_usage(&self, usage_date: NaiveDate) -> Result<DailyUsage> {
        Ok(DailyUsage {
            usage_date,
            units: self.units,
            raw: serde_json::json!({"source": "fake", "units": self.units}),
        })
    }
}
