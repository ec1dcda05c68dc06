//! Typed entities and the error taxonomy shared by every subsystem.

mod agent;
mod audit;
mod cost;
mod engagement;
mod error;
mod metrics;
mod oauth;
mod pdca;
mod post;
mod research;

pub use agent::{Account, AccountType, Agent, AgentStatus};
pub use audit::{AuditLog, AuditStatus};
pub use cost::{CostLog, APP_AGENT_ID};
pub use engagement::{ActionType, EngagementAction};
pub use error::{PostOpsError, Result};
pub use metrics::{
    DailyUsage, ExternalPost, ExternalPostMetrics, MetricsCollectionType, PostMetrics,
};
pub use oauth::{OAuthState, XAuthToken};
pub use pdca::{
    Analysis, AnalyticsSummary, AutoStopNote, CreatedPostRef, DailyPdca, ErrorPayload,
    FetchSummaryBlock, SearchSummary, SkippedEntry, Strategy,
};
pub use post::{build_post_content_hash, normalize_post_content, NewPost, Post, PostType};
pub use research::{
    FetchLog, FetchStatus, FetchSummary, SearchLog, SearchLogPayload, SearchResult, SearchSource,
    TargetPost, TargetPostCandidate,
};
