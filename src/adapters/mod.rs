//! External-collaborator seams.
//!
//! Every network dependency sits behind one of these narrow traits; the core
//! never branches on adapter identity beyond startup selection. Fakes are
//! deterministic and used both under test and when the corresponding real
//! toggle is off.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    DailyUsage, ExternalPost, ExternalPostMetrics, FetchStatus, FetchSummary, Result,
    SearchResult, TargetPost,
};

mod fake;
mod gemini;
mod usage;
mod web_fetch;
mod x_api;

pub use fake::{
    FakePlatformClient, FakePoster, FakeSummarizer, FakeTargetPostSource, FakeUsageClient,
    FakeWebSearchClient, FakeXSearchClient,
};
pub use gemini::{GeminiSummarizer, GeminiWebSearchClient};
pub use usage::XUsageClient;
pub use web_fetch::{WebFetchClient, WebFetchConfig};
pub use x_api::{extract_tweet_id, RealPoster, RealTargetPostSource, RealXClient};

/// Observation capabilities of the external platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn resolve_user_id(&self) -> Result<String>;
    async fn list_posts(&self, agent_id: i64, target_date: NaiveDate)
        -> Result<Vec<ExternalPost>>;
    async fn get_post_metrics(&self, post: &ExternalPost) -> Result<ExternalPostMetrics>;
    async fn get_daily_usage(&self, usage_date: NaiveDate) -> Result<DailyUsage>;
}

/// Publication capabilities; each method returns the external id of the
/// created post (the root id for threads).
#[async_trait]
pub trait Poster: Send + Sync {
    async fn post_text(&self, agent_id: i64, text: &str) -> Result<String>;
    async fn post_thread(&self, agent_id: i64, parts: &[String]) -> Result<String>;
    async fn post_reply(&self, agent_id: i64, target_post_url: &str, text: &str)
        -> Result<String>;
    async fn post_quote_rt(
        &self,
        agent_id: i64,
        target_post_url: &str,
        text: &str,
    ) -> Result<String>;
}

/// Search over one source; hits come back already normalized.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>>;
}

/// Recent posts from followed handles, candidates for reply/quote drafts.
#[async_trait]
pub trait TargetPostSource: Send + Sync {
    async fn list_target_posts(
        &self,
        agent_id: i64,
        handles: &[String],
        limit: usize,
    ) -> Result<Vec<TargetPost>>;
}

/// Outcome of one page fetch; failures are encoded in the shape, not the
/// error channel.
#[derive(Debug, Clone)]
pub struct WebFetchOutcome {
    pub url: String,
    pub status: FetchStatus,
    pub http_status: Option<i64>,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub extracted_text: Option<String>,
    pub failure_reason: Option<String>,
}

impl WebFetchOutcome {
    pub fn failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: FetchStatus::Failed,
            http_status: None,
            content_type: None,
            content_length: None,
            extracted_text: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Bounded page fetch with text extraction.
#[async_trait]
pub trait WebFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> WebFetchOutcome;
}

/// LLM summarization of extracted page text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, extracted_text: &str) -> Result<FetchSummary>;
}

/// Platform usage-units endpoint.
#[async_trait]
pub trait UsageClient: Send + Sync {
    async fn fetch_daily_usage(&self, usage_date: NaiveDate) -> Result<DailyUsage>;
}
