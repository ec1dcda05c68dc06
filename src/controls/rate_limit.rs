use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{ActionType, Result};
use crate::storage::Store;

pub const DEFAULT_ENGAGEMENT_DAILY_LIMIT: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateStatus {
    pub action_type: String,
    pub daily_total_limit: i64,
    pub total_used: i64,
    pub total_remaining: i64,
    pub type_used: i64,
}

/// Daily engagement counter. The cap is a single number across reply and
/// quote actions; per-type counts are observable only.
pub struct RateLimiter {
    store: Store,
    agent_id: i64,
    target_date: NaiveDate,
    daily_total_limit: i64,
}

impl RateLimiter {
    pub fn new(store: Store, agent_id: i64, target_date: NaiveDate, daily_total_limit: i64) -> Self {
        Self {
            store,
            agent_id,
            target_date,
            daily_total_limit,
        }
    }

    async fn count_total(&self) -> Result<i64> {
        self.store
            .count_engagements(self.agent_id, self.target_date)
            .await
    }

    /// True when `requested` more actions would cross the daily cap. Counts
    /// are re-read on every call; no state is kept.
    pub async fn is_limited(&self, _action_type: ActionType, requested: i64) -> Result<bool> {
        Ok(self.count_total().await? + requested > self.daily_total_limit)
    }

    pub async fn status(&self, action_type: ActionType) -> Result<RateStatus> {
        let total_used = self.count_total().await?;
        let type_used = self
            .store
            .count_engagements_by_type(self.agent_id, self.target_date, action_type)
            .await?;
        Ok(RateStatus {
            action_type: action_type.as_str().to_string(),
            daily_total_limit: self.daily_total_limit,
            total_used,
            total_remaining: (self.daily_total_limit - total_used).max(0),
            type_used,
        })
    }
}
