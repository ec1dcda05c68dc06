//! Command-line surface and adapter composition for the binary.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::{
    FakePlatformClient, FakeTargetPostSource, FakeWebSearchClient, FakeXSearchClient,
    GeminiSummarizer, GeminiWebSearchClient, PlatformClient, RealTargetPostSource, RealXClient,
    SearchClient, Summarizer, TargetPostSource, UsageClient, WebFetchClient, XUsageClient,
};
use crate::config::Config;
use crate::domain::{PostOpsError, Result};
use crate::oauth::{OAuthClient, TokenProvider};
use crate::storage::Store;
use crate::worker::{DailyRoutine, PostingWorker};

#[derive(Debug, Parser)]
#[command(name = "post-ops", about = "Multi-tenant social posting orchestrator")]
pub struct Cli {
    /// Optional TOML configuration overlay.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the daily routine once for one agent.
    RunOnce {
        #[arg(long)]
        agent_id: i64,
        /// Base date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Run the blocking scheduler, or a one-shot pass.
    Scheduler {
        /// Run all active agents once and exit.
        #[arg(long)]
        once: bool,
        /// Run one posting batch and exit.
        #[arg(long)]
        once_posts: bool,
    },
    /// Serve the dashboard and OAuth API.
    Serve,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Open the store; `DATABASE_URL` is only required here.
pub async fn open_store(config: &Config) -> Result<Store> {
    let url = config.require_database_url()?;
    Store::from_url(url).await
}

fn build_platform(config: &Config) -> Result<Arc<dyn PlatformClient>> {
    if config.toggles.use_real_x {
        let token = config
            .platform
            .bearer_token
            .as_deref()
            .ok_or_else(|| PostOpsError::config("X_BEARER_TOKEN is required when USE_REAL_X=1"))?;
        Ok(Arc::new(RealXClient::new(
            token,
            config.platform.user_id.clone(),
        )))
    } else {
        Ok(Arc::new(FakePlatformClient))
    }
}

fn build_web_search(config: &Config) -> Result<Arc<dyn SearchClient>> {
    if config.toggles.use_gemini_web_search {
        let api_key = config.llm.gemini_api_key.as_deref().ok_or_else(|| {
            PostOpsError::config("GEMINI_API_KEY is required when USE_GEMINI_WEB_SEARCH=1")
        })?;
        Ok(Arc::new(GeminiWebSearchClient::new(
            api_key,
            config.llm.gemini_model.clone(),
        )))
    } else {
        Ok(Arc::new(FakeWebSearchClient))
    }
}

fn build_summarizer(config: &Config) -> Result<Option<Arc<dyn Summarizer>>> {
    if !config.toggles.use_gemini_summarize {
        return Ok(None);
    }
    let api_key = config.llm.gemini_api_key.as_deref().ok_or_else(|| {
        PostOpsError::config("GEMINI_API_KEY is required when USE_GEMINI_SUMMARIZE=1")
    })?;
    Ok(Some(Arc::new(GeminiSummarizer::new(
        api_key,
        config.llm.gemini_model.clone(),
    ))))
}

fn build_target_source(config: &Config) -> Result<Arc<dyn TargetPostSource>> {
    if config.toggles.use_real_x {
        let token = config
            .platform
            .bearer_token
            .as_deref()
            .ok_or_else(|| PostOpsError::config("X_BEARER_TOKEN is required when USE_REAL_X=1"))?;
        Ok(Arc::new(RealTargetPostSource::new(
            RealXClient::new(token, config.platform.user_id.clone()),
            config.platform.target_posts_per_handle,
        )))
    } else {
        Ok(Arc::new(FakeTargetPostSource))
    }
}

fn build_usage_client(config: &Config) -> Option<Arc<dyn UsageClient>> {
    if !config.toggles.use_x_usage {
        return None;
    }
    config
        .platform
        .bearer_token
        .as_deref()
        .map(|token| Arc::new(XUsageClient::new(token)) as Arc<dyn UsageClient>)
}

/// Compose the daily routine from configuration toggles.
pub fn build_daily_routine(store: Store, config: Config) -> Result<DailyRoutine> {
    let platform = build_platform(&config)?;
    let web_search = build_web_search(&config)?;
    let x_search: Arc<dyn SearchClient> = Arc::new(FakeXSearchClient);
    let target_source = build_target_source(&config)?;
    let fetcher = Arc::new(WebFetchClient::default());
    let summarizer = build_summarizer(&config)?;
    let usage_client = build_usage_client(&config);

    Ok(DailyRoutine::new(
        store,
        config,
        platform,
        web_search,
        x_search,
        target_source,
        fetcher,
        summarizer,
        usage_client,
    ))
}

/// Compose the posting worker from configuration toggles.
pub fn build_posting_worker(store: Store, config: Config) -> PostingWorker {
    let mut worker = PostingWorker::new(store.clone(), config.clone());
    if config.toggles.use_real_x {
        let provider = TokenProvider::new(store, OAuthClient::new(config.oauth.clone()));
        worker = worker.with_token_provider(provider);
    }
    if let Some(usage_client) = build_usage_client(&config) {
        worker = worker.with_usage_client(usage_client);
    }
    worker
}
