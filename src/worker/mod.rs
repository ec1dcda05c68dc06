//! Workers: the per-agent daily routine, the posting claim/publish loop,
//! usage reconciliation and run-log output.

pub mod daily_routine;
pub mod planner;
pub mod posting;
pub mod reconcile;
pub mod run_log;

pub use daily_routine::{DailyRoutine, RoutineOutcome, METRICS_LAG_DAYS};
pub use planner::{build_post_drafts, compute_mix, create_next_day_posts, PlanBuildResult, PostDraft};
pub use posting::{PostingResult, PostingWorker};
pub use reconcile::{ReconcileReport, UsageReconciler};
