//! Environment-driven configuration.
//!
//! The binary reads the environment exactly once (`Config::from_env`); every
//! worker and handler receives plain config structs afterwards, which keeps
//! the library hermetic under test. `DATABASE_URL` is lazy: building a config
//! without it succeeds, opening the store without it fails.

use std::path::PathBuf;
use std::str::FromStr;

use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{PostOpsError, Result};

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_decimal(name: &str, default: &str) -> Decimal {
    let fallback = Decimal::from_str(default).unwrap_or(Decimal::ZERO);
    match std::env::var(name) {
        Ok(raw) => Decimal::from_str(&raw).unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_flag(name: &str) -> bool {
    matches!(std::env::var(name).as_deref(), Ok("1"))
}

/// Worker timing: daily cron slot, posting slot and polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// IANA timezone the scheduler and planner operate in.
    pub timezone: Tz,
    pub daily_hour: u32,
    pub daily_minute: u32,
    pub post_hour: u32,
    pub post_minute: u32,
    pub posting_poll_seconds: u64,
    pub posting_batch_size: usize,
    /// Overrides the per-agent `posts_per_day` toggle when set.
    pub posts_per_day: Option<u32>,
    /// Base directory for per-agent JSON run logs.
    pub log_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            daily_hour: 9,
            daily_minute: 0,
            post_hour: 9,
            post_minute: 0,
            posting_poll_seconds: 60,
            posting_batch_size: 10,
            posts_per_day: None,
            log_dir: PathBuf::from("apps/worker/logs"),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let timezone: Tz = env_string("WORKER_TZ", "UTC")
            .parse()
            .unwrap_or(chrono_tz::UTC);
        Self {
            timezone,
            daily_hour: env_parse("WORKER_DAILY_HOUR", 9),
            daily_minute: env_parse("WORKER_DAILY_MINUTE", 0),
            post_hour: env_parse("POST_HOUR", 9),
            post_minute: env_parse("POST_MINUTE", 0),
            posting_poll_seconds: env_parse("POSTING_POLL_SECONDS", 60).max(1),
            posting_batch_size: env_parse("POSTING_BATCH_SIZE", 10).max(1),
            posts_per_day: env_opt("POSTS_PER_DAY").and_then(|v| v.parse().ok()),
            log_dir: PathBuf::from(env_string("WORKER_LOG_DIR", "apps/worker/logs")),
        }
    }
}

/// Nominal cost constants charged against the daily ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetCosts {
    pub plan_llm: Decimal,
    pub x_search: Decimal,
    pub web_search: Decimal,
    pub web_fetch_llm: Decimal,
    pub web_summarize_llm: Decimal,
    pub target_post_fetch: Decimal,
    /// Pre-flight observation reservation of the daily routine.
    pub routine_x: Decimal,
    pub routine_llm: Decimal,
    /// Per-publication platform cost reserved by the posting worker.
    pub posting_x: Decimal,
}

impl Default for BudgetCosts {
    fn default() -> Self {
        Self {
            plan_llm: Decimal::new(50, 2),
            x_search: Decimal::new(100, 2),
            web_search: Decimal::new(100, 2),
            web_fetch_llm: Decimal::new(30, 2),
            web_summarize_llm: Decimal::new(100, 2),
            target_post_fetch: Decimal::new(25, 2),
            routine_x: Decimal::new(100, 2),
            routine_llm: Decimal::new(200, 2),
            posting_x: Decimal::new(100, 2),
        }
    }
}

impl BudgetCosts {
    pub fn from_env() -> Self {
        Self {
            plan_llm: env_decimal("PLAN_LLM_COST", "0.50"),
            x_search: env_decimal("X_SEARCH_COST", "1.00"),
            web_search: env_decimal("WEB_SEARCH_COST", "1.00"),
            web_fetch_llm: env_decimal("WEB_FETCH_LLM_COST", "0.30"),
            web_summarize_llm: env_decimal("WEB_SUMMARIZE_LLM_COST", "1.00"),
            target_post_fetch: env_decimal("TARGET_POST_FETCH_COST", "0.25"),
            routine_x: Decimal::new(100, 2),
            routine_llm: Decimal::new(200, 2),
            posting_x: Decimal::new(100, 2),
        }
    }
}

/// Research bounds: per-source daily caps, result sizing and topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub x_search_max: i64,
    pub web_search_max: i64,
    pub web_fetch_max: i64,
    pub top_k: usize,
    pub snippet_limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            x_search_max: 10,
            web_search_max: 10,
            web_fetch_max: 3,
            top_k: 3,
            snippet_limit: 300,
            topic: None,
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        Self {
            x_search_max: env_parse("X_SEARCH_MAX", 10),
            web_search_max: env_parse("WEB_SEARCH_MAX", 10),
            web_fetch_max: env_parse("WEB_FETCH_MAX", 3),
            top_k: env_parse("SEARCH_TOP_K", 3),
            snippet_limit: env_parse("SEARCH_SNIPPET_LIMIT", 300),
            topic: env_opt("SEARCH_TOPIC"),
        }
    }
}

/// Planner ratios and the URL-embedding switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub thread_ratio: f64,
    pub reply_ratio: f64,
    pub quote_ratio: f64,
    pub allow_url_for_validation: bool,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            thread_ratio: 0.2,
            reply_ratio: 0.2,
            quote_ratio: 0.2,
            allow_url_for_validation: false,
        }
    }
}

impl PlanConfig {
    pub fn from_env() -> Self {
        Self {
            thread_ratio: env_parse("PLAN_THREAD_RATIO", 0.2_f64).max(0.0),
            reply_ratio: env_parse("PLAN_REPLY_RATIO", 0.2_f64).max(0.0),
            quote_ratio: env_parse("PLAN_QUOTE_RATIO", 0.2_f64).max(0.0),
            allow_url_for_validation: env_flag("PLAN_ALLOW_URL_FOR_VALIDATION"),
        }
    }
}

/// Adapter selection switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterToggles {
    pub use_real_x: bool,
    pub use_gemini_web_search: bool,
    pub use_gemini_summarize: bool,
    pub use_x_usage: bool,
    pub posting_usage_reconcile: bool,
}

impl AdapterToggles {
    pub fn from_env() -> Self {
        Self {
            use_real_x: env_flag("USE_REAL_X"),
            use_gemini_web_search: env_flag("USE_GEMINI_WEB_SEARCH"),
            use_gemini_summarize: env_flag("USE_GEMINI_SUMMARIZE"),
            use_x_usage: env_flag("USE_X_USAGE"),
            posting_usage_reconcile: env_flag("POSTING_USAGE_RECONCILE"),
        }
    }
}

/// OAuth client settings for the external platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            authorize_url: "https://x.com/i/oauth2/authorize".to_string(),
            token_url: "https://api.x.com/2/oauth2/token".to_string(),
            scopes: vec![
                "tweet.write".to_string(),
                "users.read".to_string(),
                "offline.access".to_string(),
                "tweet.read".to_string(),
            ],
        }
    }
}

impl OAuthConfig {
    pub fn from_env() -> Self {
        Self {
            client_id: env_opt("X_OAUTH_CLIENT_ID"),
            client_secret: env_opt("X_OAUTH_CLIENT_SECRET"),
            redirect_uri: env_opt("X_OAUTH_REDIRECT_URI"),
            ..Default::default()
        }
    }

    pub fn require_client_id(&self) -> Result<&str> {
        self.client_id
            .as_deref()
            .ok_or_else(|| PostOpsError::config("X_OAUTH_CLIENT_ID is required"))
    }

    pub fn require_redirect_uri(&self) -> Result<&str> {
        self.redirect_uri
            .as_deref()
            .ok_or_else(|| PostOpsError::config("X_OAUTH_REDIRECT_URI is required"))
    }
}

/// Platform API credentials and pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    pub target_posts_per_handle: i64,
    /// Handles harvested for reply/quote target candidates.
    #[serde(default)]
    pub target_handles: Vec<String>,
    pub target_posts_limit: usize,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            user_id: None,
            unit_price: None,
            target_posts_per_handle: 5,
            target_handles: Vec::new(),
            target_posts_limit: 10,
        }
    }
}

impl PlatformConfig {
    pub fn from_env() -> Self {
        Self {
            bearer_token: env_opt("X_BEARER_TOKEN"),
            user_id: env_opt("X_USER_ID"),
            unit_price: env_opt("X_UNIT_PRICE").and_then(|v| Decimal::from_str(&v).ok()),
            target_posts_per_handle: env_parse("TARGET_POSTS_PER_HANDLE", 5).clamp(1, 10),
            target_handles: env_opt("TARGET_HANDLES")
                .map(|raw| {
                    raw.split(',')
                        .map(|handle| handle.trim().to_string())
                        .filter(|handle| !handle.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            target_posts_limit: env_parse("TARGET_POSTS_LIMIT", 10),
        }
    }
}

/// LLM provider credentials for search and summarization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            gemini_model: env_opt("GEMINI_MODEL"),
        }
    }
}

/// HTTP API bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub worker: WorkerConfig,
    pub costs: BudgetCosts,
    pub search: SearchConfig,
    pub plan: PlanConfig,
    pub toggles: AdapterToggles,
    pub oauth: OAuthConfig,
    pub platform: PlatformConfig,
    pub llm: LlmConfig,
    pub api: ApiConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env_opt("DATABASE_URL"),
            worker: WorkerConfig::from_env(),
            costs: BudgetCosts::from_env(),
            search: SearchConfig::from_env(),
            plan: PlanConfig::from_env(),
            toggles: AdapterToggles::from_env(),
            oauth: OAuthConfig::from_env(),
            platform: PlatformConfig::from_env(),
            llm: LlmConfig::from_env(),
            api: ApiConfig::default(),
        }
    }

    /// Optional TOML overlay, mirroring the env surface.
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| PostOpsError::config(e.to_string()))
    }

    /// Lazy `DATABASE_URL` check: only called when a store is opened.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| PostOpsError::config("DATABASE_URL is required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.database_url.is_none());
        assert!(config.require_database_url().is_err());
        assert_eq!(config.worker.posting_batch_size, 10);
        assert_eq!(config.search.web_fetch_max, 3);
        assert_eq!(config.costs.plan_llm, Decimal::new(50, 2));
        assert_eq!(config.plan.thread_ratio, 0.2);
    }

    #[test]
    fn test_oauth_requirements() {
        let mut oauth = OAuthConfig::default();
        assert!(oauth.require_client_id().is_err());
        oauth.client_id = Some("cid".to_string());
        assert_eq!(oauth.require_client_id().unwrap(), "cid");
    }
}
