use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Result, SearchSource};
use crate::storage::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterStatus {
    pub source: String,
    pub daily_limit: i64,
    pub used: i64,
    pub remaining: i64,
}

/// Per-source daily search caps over (agent, date). Counts are re-read on
/// each call; the limiter mutates nothing.
pub struct SearchLimiter {
    store: Store,
    agent_id: i64,
    target_date: NaiveDate,
    x_search_max: i64,
    web_search_max: i64,
}

impl SearchLimiter {
    pub fn new(
        store: Store,
        agent_id: i64,
        target_date: NaiveDate,
        x_search_max: i64,
        web_search_max: i64,
    ) -> Self {
        Self {
            store,
            agent_id,
            target_date,
            x_search_max,
            web_search_max,
        }
    }

    fn source_max(&self, source: SearchSource) -> i64 {
        match source {
            SearchSource::X => self.x_search_max,
            SearchSource::Web => self.web_search_max,
        }
    }

    async fn count(&self, source: SearchSource) -> Result<i64> {
        self.store
            .count_search_logs(self.agent_id, self.target_date, source)
            .await
    }

    pub async fn is_limited(&self, source: SearchSource, requested: i64) -> Result<bool> {
        Ok(self.count(source).await? + requested > self.source_max(source))
    }

    pub async fn status(&self, source: SearchSource) -> Result<LimiterStatus> {
        let used = self.count(source).await?;
        let daily_limit = self.source_max(source);
        Ok(LimiterStatus {
            source: source.as_str().to_string(),
            daily_limit,
            used,
            remaining: (daily_limit - used).max(0),
        })
    }
}

/// Daily page-fetch cap. Succeeded and failed attempts count; skipped rows
/// are audit-only.
pub struct FetchLimiter {
    store: Store,
    agent_id: i64,
    target_date: NaiveDate,
    web_fetch_max: i64,
}

impl FetchLimiter {
    pub fn new(store: Store, agent_id: i64, target_date: NaiveDate, web_fetch_max: i64) -> Self {
        Self {
            store,
            agent_id,
            target_date,
            web_fetch_max,
        }
    }

    async fn count(&self) -> Result<i64> {
        self.store
            .count_fetch_attempts(self.agent_id, self.target_date)
            .await
    }

    pub async fn is_limited(&self, requested: i64) -> Result<bool> {
        Ok(self.count().await? + requested > self.web_fetch_max)
    }

    pub async fn status(&self) -> Result<LimiterStatus> {
        let used = self.count().await?;
        Ok(LimiterStatus {
            source: "web_fetch".to_string(),
            daily_limit: self.web_fetch_max,
            used,
            remaining: (self.web_fetch_max - used).max(0),
        })
    }
}
