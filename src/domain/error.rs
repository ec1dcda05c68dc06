use rust_decimal::Decimal;
use thiserror::Error;

/// Error taxonomy for the posting control plane.
///
/// Budget, rate-limit and guard outcomes are modelled as errors so that
/// pipeline steps can bubble them with `?` and callers can translate them
/// into skip results without string matching.
#[derive(Error, Debug)]
pub enum PostOpsError {
    #[error("daily budget exceeded: requested x={x_cost} llm={llm_cost}")]
    BudgetExceeded { x_cost: Decimal, llm_cost: Decimal },

    #[error("engagement rate limit reached")]
    RateLimited,

    #[error("missing platform user id: {0}")]
    MissingUserId(String),

    #[error("oauth state invalid or expired")]
    OAuthStateInvalid,

    #[error("oauth token refresh failed: {0}")]
    OAuthRefresh(String),

    #[error("{0}")]
    OAuth(String),

    #[error("auth token not found for account {0}")]
    TokenNotFound(i64),

    #[error("invalid target post url: {0}")]
    InvalidTargetUrl(String),

    #[error("duplicate content for bucket date")]
    DuplicateContent,

    #[error("platform api error: {0}")]
    PlatformApi(String),

    #[error("search adapter error: {0}")]
    Search(String),

    #[error("summarize adapter error: {0}")]
    Summarize(String),

    #[error("usage adapter error: {0}")]
    Usage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PostOpsError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short stable identifier used in audit rows and error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::RateLimited => "rate_limited",
            Self::MissingUserId(_) => "missing_user_id",
            Self::OAuthStateInvalid => "oauth_state_invalid",
            Self::OAuthRefresh(_) => "x_auth_refresh_failed",
            Self::OAuth(_) => "oauth_error",
            Self::TokenNotFound(_) => "x_auth_token_not_found",
            Self::InvalidTargetUrl(_) => "invalid_target_url",
            Self::DuplicateContent => "duplicate_content",
            Self::PlatformApi(_) => "platform_api_error",
            Self::Search(_) => "search_error",
            Self::Summarize(_) => "summarize_error",
            Self::Usage(_) => "usage_error",
            Self::Config(_) => "config_error",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database_error",
            Self::Migration(_) => "migration_error",
            Self::Serialization(_) => "serialization_error",
            Self::Http(_) => "http_error",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// True when the underlying database error is a unique-constraint hit.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PostOpsError>;
