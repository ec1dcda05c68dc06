//! Cross-cutting guards: budget ledger, engagement and research limiters,
//! stop/resume guard and the feature-toggle resolver.

mod budget;
mod guard;
mod rate_limit;
mod search_limit;
mod toggles;

pub use budget::{BudgetLedger, BudgetStatus};
pub use guard::{GuardManager, AUTO_STOP_THRESHOLD};
pub use rate_limit::{RateLimiter, RateStatus, DEFAULT_ENGAGEMENT_DAILY_LIMIT};
pub use search_limit::{FetchLimiter, LimiterStatus, SearchLimiter};
pub use toggles::{read_int_toggle, validate_toggle_patch};
