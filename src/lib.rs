//! post-ops — multi-tenant social posting and analytics orchestrator.
//!
//! The control plane of a daily observe → research → plan → publish cycle:
//! a per-agent budget ledger with sub-bucket caps, daily engagement and
//! research limiters, a stop/resume guard with an auto-stop circuit breaker,
//! an at-most-once posting claim protocol, and the OAuth token lifecycle.

pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod controls;
pub mod domain;
pub mod oauth;
pub mod observability;
pub mod scheduler;
pub mod storage;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use controls::{
    BudgetLedger, BudgetStatus, FetchLimiter, GuardManager, RateLimiter, SearchLimiter,
};
pub use domain::{PostOpsError, Result};
pub use scheduler::Scheduler;
pub use storage::{ClaimedBatch, Store};
pub use worker::{DailyRoutine, PostingWorker, RoutineOutcome, UsageReconciler};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library with default observability.
pub fn init() {
    observability::init_tracing();
}
