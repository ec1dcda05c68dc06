//! Backend-dispatching store facade.
//!
//! Every query of the control plane goes through [`Store`]; the posting claim
//! is the one stateful primitive and is modelled by [`ClaimedBatch`], which
//! owns the open transaction on PostgreSQL.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

#[cfg(feature = "postgres")]
use sqlx::{Postgres, Transaction};

use super::database::{DatabaseConfig, DatabasePool};
use super::sqlite;

#[cfg(feature = "postgres")]
use super::postgres;

use crate::domain::{
    Account, AccountType, ActionType, Agent, AgentStatus, AuditLog, AuditStatus, CostLog,
    DailyPdca, ExternalPost, ExternalPostMetrics, FetchLog, MetricsCollectionType, NewPost,
    OAuthState, Post, PostOpsError, Result, SearchLog, SearchLogPayload, SearchSource,
    TargetPost, TargetPostCandidate, XAuthToken,
};

fn translate_dedupe(err: PostOpsError) -> PostOpsError {
    if err.is_unique_violation() {
        PostOpsError::DuplicateContent
    } else {
        err
    }
}

/// Handle to the relational store, cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: DatabasePool,
}

impl Store {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self {
            pool: DatabasePool::new(config).await?,
        })
    }

    /// Open from a connection URL, picking the backend from the scheme.
    pub async fn from_url(url: &str) -> Result<Self> {
        Self::new(&DatabaseConfig::from_url(url)?).await
    }

    /// Fresh in-memory store with migrations applied.
    pub async fn in_memory() -> Result<Self> {
        Self::new(&DatabaseConfig::sqlite_memory()).await
    }

    pub async fn health_check(&self) -> Result<()> {
        self.pool.health_check().await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // -- accounts & agents --------------------------------------------------

    pub async fn get_account(&self, id: i64) -> Result<Option<Account>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::get_account(p.pool(), id).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::get_account(p.pool(), id).await,
        }
    }

    pub async fn insert_account(
        &self,
        name: &str,
        account_type: AccountType,
        api_keys: &Value,
        media_assets_path: &str,
    ) -> Result<i64> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::insert_account(p.pool(), name, account_type, api_keys, media_assets_path)
                    .await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::insert_account(p.pool(), name, account_type, api_keys, media_assets_path)
                    .await
            }
        }
    }

    pub async fn get_agent(&self, id: i64) -> Result<Option<Agent>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::get_agent(p.pool(), id).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::get_agent(p.pool(), id).await,
        }
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::list_agents(p.pool()).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::list_agents(p.pool()).await,
        }
    }

    pub async fn list_active_agent_ids(&self) -> Result<Vec<i64>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::list_active_agent_ids(p.pool()).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::list_active_agent_ids(p.pool()).await,
        }
    }

    pub async fn insert_agent_with_id(
        &self,
        id: i64,
        account_id: i64,
        status: AgentStatus,
    ) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::insert_agent_with_id(p.pool(), id, account_id, status).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::insert_agent_with_id(p.pool(), id, account_id, status).await
            }
        }
    }

    /// Fetch the agent, bootstrapping a business account and an active agent
    /// row when the id is unknown.
    pub async fn ensure_agent(&self, agent_id: i64) -> Result<Agent> {
        if let Some(agent) = self.get_agent(agent_id).await? {
            return Ok(agent);
        }
        let account_id = self
            .insert_account(
                &format!("agent-{agent_id}"),
                AccountType::Business,
                &serde_json::json!({"x": "fake"}),
                "/tmp",
            )
            .await?;
        self.insert_agent_with_id(agent_id, account_id, AgentStatus::Active)
            .await?;
        self.get_agent(agent_id)
            .await?
            .ok_or_else(|| PostOpsError::NotFound(format!("agent {agent_id}")))
    }

    pub async fn update_agent_budget(&self, id: i64, daily_budget: i64) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::update_agent_budget(p.pool(), id, daily_budget).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::update_agent_budget(p.pool(), id, daily_budget).await
            }
        }
    }

    pub async fn update_agent_budget_splits(
        &self,
        id: i64,
        daily_budget: i64,
        split_x: i64,
        split_llm: i64,
    ) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::update_agent_budget_splits(p.pool(), id, daily_budget, split_x, split_llm)
                    .await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::update_agent_budget_splits(p.pool(), id, daily_budget, split_x, split_llm)
                    .await
            }
        }
    }

    pub async fn update_agent_toggles(&self, id: i64, toggles: &Value) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::update_agent_toggles(p.pool(), id, toggles).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::update_agent_toggles(p.pool(), id, toggles).await,
        }
    }

    pub async fn stop_agent(
        &self,
        id: i64,
        reason: &str,
        stopped_at: DateTime<Utc>,
        stop_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::stop_agent(p.pool(), id, reason, stopped_at, stop_until).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::stop_agent(p.pool(), id, reason, stopped_at, stop_until).await
            }
        }
    }

    pub async fn resume_agent(&self, id: i64) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::resume_agent(p.pool(), id).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::resume_agent(p.pool(), id).await,
        }
    }

    // -- posts --------------------------------------------------------------

    pub async fn list_agent_posts(&self, agent_id: i64) -> Result<Vec<Post>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::list_agent_posts(p.pool(), agent_id).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::list_agent_posts(p.pool(), agent_id).await,
        }
    }

    pub async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::get_post(p.pool(), id).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::get_post(p.pool(), id).await,
        }
    }

    pub async fn find_post_by_external_id(
        &self,
        agent_id: i64,
        external_id: &str,
    ) -> Result<Option<Post>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::find_post_by_external_id(p.pool(), agent_id, external_id).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::find_post_by_external_id(p.pool(), agent_id, external_id).await
            }
        }
    }

    pub async fn insert_post(&self, post: &NewPost) -> Result<i64> {
        let result = match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::insert_post(p.pool(), post).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::insert_post(p.pool(), post).await,
        };
        result.map_err(translate_dedupe)
    }

    /// Refresh an ingested post from the platform payload.
    pub async fn update_external_post(&self, post_id: i64, external: &ExternalPost) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::update_external_post(p.pool(), post_id, external).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::update_external_post(p.pool(), post_id, external).await
            }
        }
    }

    /// Upsert a platform post by (agent, external id); returns the local row.
    pub async fn upsert_external_post(
        &self,
        agent_id: i64,
        external: &ExternalPost,
    ) -> Result<Post> {
        if let Some(existing) = self
            .find_post_by_external_id(agent_id, &external.external_id)
            .await?
        {
            self.update_external_post(existing.id, external).await?;
            return self
                .get_post(existing.id)
                .await?
                .ok_or_else(|| PostOpsError::NotFound(format!("post {}", existing.id)));
        }

        let new_post = NewPost {
            agent_id,
            external_id: Some(external.external_id.clone()),
            content: external.text.clone(),
            post_type: external.post_type,
            media_urls: external.media_urls.clone(),
            posted_at: Some(external.posted_at),
            ..Default::default()
        };
        let id = self.insert_post(&new_post).await?;
        self.get_post(id)
            .await?
            .ok_or_else(|| PostOpsError::NotFound(format!("post {id}")))
    }

    pub async fn count_scheduled_in_window(
        &self,
        agent_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::count_scheduled_in_window(p.pool(), agent_id, start, end).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::count_scheduled_in_window(p.pool(), agent_id, start, end).await
            }
        }
    }

    pub async fn hash_bucket_exists(
        &self,
        agent_id: i64,
        content_hash: &str,
        bucket_date: NaiveDate,
    ) -> Result<bool> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::hash_bucket_exists(p.pool(), agent_id, content_hash, bucket_date).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::hash_bucket_exists(p.pool(), agent_id, content_hash, bucket_date).await
            }
        }
    }

    pub async fn find_posted_duplicate(
        &self,
        agent_id: i64,
        content_hash: &str,
        bucket_date: NaiveDate,
        exclude_post_id: i64,
    ) -> Result<Option<i64>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::find_posted_duplicate(
                    p.pool(),
                    agent_id,
                    content_hash,
                    bucket_date,
                    exclude_post_id,
                )
                .await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::find_posted_duplicate(
                    p.pool(),
                    agent_id,
                    content_hash,
                    bucket_date,
                    exclude_post_id,
                )
                .await
            }
        }
    }

    /// Stamp dedupe fields; a unique-constraint hit surfaces as
    /// [`PostOpsError::DuplicateContent`].
    pub async fn set_post_dedupe_fields(
        &self,
        post_id: i64,
        content_hash: &str,
        bucket_date: NaiveDate,
    ) -> Result<()> {
        let result = match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::set_post_dedupe_fields(p.pool(), post_id, content_hash, bucket_date).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::set_post_dedupe_fields(p.pool(), post_id, content_hash, bucket_date).await
            }
        };
        result.map_err(translate_dedupe)
    }

    /// Claim due posts for publication.
    ///
    /// PostgreSQL: `FOR UPDATE SKIP LOCKED` inside a transaction held by the
    /// returned batch. SQLite: plain read; at-most-once is enforced by the
    /// compare-and-swap in [`ClaimedBatch::mark_posted`].
    pub async fn claim_due_posts(
        &self,
        now: DateTime<Utc>,
        batch_size: usize,
    ) -> Result<ClaimedBatch> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                let posts = sqlite::select_due_posts(p.pool(), now, batch_size as i64).await?;
                Ok(ClaimedBatch {
                    posts,
                    inner: ClaimInner::Sqlite(p.clone()),
                })
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                let mut tx = p.pool().begin().await?;
                let posts =
                    postgres::select_due_posts_for_update(&mut tx, now, batch_size as i64).await?;
                Ok(ClaimedBatch {
                    posts,
                    inner: ClaimInner::Postgres(tx),
                })
            }
        }
    }

    // -- metrics ------------------------------------------------------------

    pub async fn has_metrics(
        &self,
        post_id: i64,
        collection_type: MetricsCollectionType,
    ) -> Result<bool> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::has_metrics(p.pool(), post_id, collection_type).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::has_metrics(p.pool(), post_id, collection_type).await
            }
        }
    }

    pub async fn count_metrics(
        &self,
        post_id: i64,
        collection_type: MetricsCollectionType,
    ) -> Result<i64> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::count_metrics(p.pool(), post_id, collection_type).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::count_metrics(p.pool(), post_id, collection_type).await
            }
        }
    }

    pub async fn insert_post_metrics(
        &self,
        post_id: i64,
        collection_type: MetricsCollectionType,
        collected_at: DateTime<Utc>,
        metrics: &ExternalPostMetrics,
    ) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::insert_post_metrics(p.pool(), post_id, collection_type, collected_at, metrics)
                    .await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::insert_post_metrics(
                    p.pool(),
                    post_id,
                    collection_type,
                    collected_at,
                    metrics,
                )
                .await
            }
        }
    }

    // -- cost logs ----------------------------------------------------------

    pub async fn get_cost_log(&self, agent_id: i64, date: NaiveDate) -> Result<Option<CostLog>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::get_cost_log(p.pool(), agent_id, date).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::get_cost_log(p.pool(), agent_id, date).await,
        }
    }

    /// Committed (x, llm, total) spend for the agent-day.
    pub async fn sum_costs(
        &self,
        agent_id: i64,
        date: NaiveDate,
    ) -> Result<(Decimal, Decimal, Decimal)> {
        Ok(match self.get_cost_log(agent_id, date).await? {
            Some(log) => (log.x_api_cost, log.llm_cost, log.total),
            None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        })
    }

    pub async fn add_costs(
        &self,
        agent_id: i64,
        date: NaiveDate,
        x_cost: Decimal,
        llm_cost: Decimal,
    ) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::add_costs(p.pool(), agent_id, date, x_cost, llm_cost).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::add_costs(p.pool(), agent_id, date, x_cost, llm_cost).await
            }
        }
    }

    pub async fn record_usage(
        &self,
        agent_id: i64,
        date: NaiveDate,
        units: i64,
        raw: &Value,
        actual_cost: Option<Decimal>,
    ) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::record_usage(p.pool(), agent_id, date, units, raw, actual_cost).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::record_usage(p.pool(), agent_id, date, units, raw, actual_cost).await
            }
        }
    }

    // -- engagement actions -------------------------------------------------

    pub async fn count_engagements(&self, agent_id: i64, date: NaiveDate) -> Result<i64> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::count_engagements(p.pool(), agent_id, date).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::count_engagements(p.pool(), agent_id, date).await,
        }
    }

    pub async fn count_engagements_by_type(
        &self,
        agent_id: i64,
        date: NaiveDate,
        action_type: ActionType,
    ) -> Result<i64> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::count_engagements_by_type(p.pool(), agent_id, date, action_type).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::count_engagements_by_type(p.pool(), agent_id, date, action_type).await
            }
        }
    }

    pub async fn insert_engagement(
        &self,
        agent_id: i64,
        target_account_id: i64,
        action_type: ActionType,
        target_post_url: &str,
        content: Option<&str>,
        executed_at: DateTime<Utc>,
    ) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::insert_engagement(
                    p.pool(),
                    agent_id,
                    target_account_id,
                    action_type,
                    target_post_url,
                    content,
                    executed_at,
                )
                .await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::insert_engagement(
                    p.pool(),
                    agent_id,
                    target_account_id,
                    action_type,
                    target_post_url,
                    content,
                    executed_at,
                )
                .await
            }
        }
    }

    // -- search, fetch and target logs --------------------------------------

    pub async fn count_search_logs(
        &self,
        agent_id: i64,
        date: NaiveDate,
        source: SearchSource,
    ) -> Result<i64> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::count_search_logs(p.pool(), agent_id, date, source).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::count_search_logs(p.pool(), agent_id, date, source).await
            }
        }
    }

    pub async fn insert_search_log(
        &self,
        agent_id: i64,
        date: NaiveDate,
        source: SearchSource,
        query: &str,
        payload: &SearchLogPayload,
        cost_estimate: Decimal,
    ) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::insert_search_log(p.pool(), agent_id, date, source, query, payload, cost_estimate)
                    .await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::insert_search_log(
                    p.pool(),
                    agent_id,
                    date,
                    source,
                    query,
                    payload,
                    cost_estimate,
                )
                .await
            }
        }
    }

    pub async fn list_search_logs(&self, agent_id: i64, date: NaiveDate) -> Result<Vec<SearchLog>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::list_search_logs(p.pool(), agent_id, date).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::list_search_logs(p.pool(), agent_id, date).await,
        }
    }

    pub async fn count_fetch_attempts(&self, agent_id: i64, date: NaiveDate) -> Result<i64> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::count_fetch_attempts(p.pool(), agent_id, date).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::count_fetch_attempts(p.pool(), agent_id, date).await
            }
        }
    }

    pub async fn insert_fetch_log(&self, log: &FetchLog) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::insert_fetch_log(p.pool(), log).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::insert_fetch_log(p.pool(), log).await,
        }
    }

    pub async fn list_fetch_logs(&self, agent_id: i64, date: NaiveDate) -> Result<Vec<FetchLog>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::list_fetch_logs(p.pool(), agent_id, date).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::list_fetch_logs(p.pool(), agent_id, date).await,
        }
    }

    /// Persist a harvested candidate; false when the URL was already seen.
    pub async fn insert_target_candidate(
        &self,
        agent_id: i64,
        date: NaiveDate,
        target: &TargetPost,
    ) -> Result<bool> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::insert_target_candidate(p.pool(), agent_id, date, target).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::insert_target_candidate(p.pool(), agent_id, date, target).await
            }
        }
    }

    pub async fn list_unused_targets(
        &self,
        agent_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TargetPostCandidate>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::list_unused_targets(p.pool(), agent_id, date).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::list_unused_targets(p.pool(), agent_id, date).await
            }
        }
    }

    pub async fn mark_target_used(&self, agent_id: i64, date: NaiveDate, url: &str) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::mark_target_used(p.pool(), agent_id, date, url).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::mark_target_used(p.pool(), agent_id, date, url).await
            }
        }
    }

    // -- PDCA ---------------------------------------------------------------

    pub async fn get_pdca(&self, agent_id: i64, date: NaiveDate) -> Result<Option<DailyPdca>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::get_pdca(p.pool(), agent_id, date).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::get_pdca(p.pool(), agent_id, date).await,
        }
    }

    pub async fn upsert_pdca(&self, pdca: &DailyPdca) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::upsert_pdca(p.pool(), pdca).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::upsert_pdca(p.pool(), pdca).await,
        }
    }

    pub async fn list_recent_pdca(&self, agent_id: i64, limit: i64) -> Result<Vec<DailyPdca>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::list_recent_pdca(p.pool(), agent_id, limit).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::list_recent_pdca(p.pool(), agent_id, limit).await,
        }
    }

    // -- audit logs ----------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_audit(
        &self,
        agent_id: i64,
        date: NaiveDate,
        source: &str,
        event_type: &str,
        status: AuditStatus,
        reason: Option<&str>,
        payload: &Value,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::insert_audit(
                    p.pool(),
                    agent_id,
                    date,
                    source,
                    event_type,
                    status,
                    reason,
                    payload,
                    created_at,
                )
                .await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::insert_audit(
                    p.pool(),
                    agent_id,
                    date,
                    source,
                    event_type,
                    status,
                    reason,
                    payload,
                    created_at,
                )
                .await
            }
        }
    }

    /// Newest-first statuses for (agent, source, event_type), capped at
    /// `limit`; used for the consecutive-failure window.
    pub async fn recent_audit_statuses(
        &self,
        agent_id: i64,
        source: &str,
        event_type: &str,
        limit: i64,
    ) -> Result<Vec<AuditStatus>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => {
                sqlite::recent_audit_statuses(p.pool(), agent_id, source, event_type, limit).await
            }
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => {
                postgres::recent_audit_statuses(p.pool(), agent_id, source, event_type, limit).await
            }
        }
    }

    pub async fn list_audits(&self, agent_id: i64, limit: i64) -> Result<Vec<AuditLog>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::list_audits(p.pool(), agent_id, limit).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::list_audits(p.pool(), agent_id, limit).await,
        }
    }

    // -- OAuth tokens & PKCE state -------------------------------------------

    pub async fn get_token_for_account(&self, account_id: i64) -> Result<Option<XAuthToken>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::get_token_for_account(p.pool(), account_id).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::get_token_for_account(p.pool(), account_id).await,
        }
    }

    pub async fn upsert_token(&self, token: &XAuthToken) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::upsert_token(p.pool(), token).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::upsert_token(p.pool(), token).await,
        }
    }

    pub async fn insert_oauth_state(&self, state: &OAuthState) -> Result<()> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::insert_oauth_state(p.pool(), state).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::insert_oauth_state(p.pool(), state).await,
        }
    }

    /// Single-use state consumption; expired or unknown states yield None.
    pub async fn take_oauth_state(
        &self,
        state: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthState>> {
        match &self.pool {
            DatabasePool::Sqlite(p) => sqlite::take_oauth_state(p.pool(), state, now).await,
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(p) => postgres::take_oauth_state(p.pool(), state, now).await,
        }
    }
}

enum ClaimInner {
    Sqlite(super::database::SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(Transaction<'static, Postgres>),
}

/// A batch of due posts owned by this worker.
///
/// On PostgreSQL the batch holds the claim transaction open, so the
/// `posted_at IS NULL` observation and the publish marker share one
/// transaction. Dropping the batch without [`ClaimedBatch::commit`] rolls the
/// markers back.
pub struct ClaimedBatch {
    posts: Vec<Post>,
    inner: ClaimInner,
}

impl ClaimedBatch {
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn take_posts(&mut self) -> Vec<Post> {
        std::mem::take(&mut self.posts)
    }

    /// Compare-and-swap publish marker; false means another worker already
    /// published the post and this one must drop it silently.
    pub async fn mark_posted(
        &mut self,
        post_id: i64,
        external_id: &str,
        posted_at: DateTime<Utc>,
    ) -> Result<bool> {
        match &mut self.inner {
            ClaimInner::Sqlite(p) => sqlite::mark_posted(p.pool(), post_id, external_id, posted_at).await,
            #[cfg(feature = "postgres")]
            ClaimInner::Postgres(tx) => {
                postgres::mark_posted_in_tx(tx, post_id, external_id, posted_at).await
            }
        }
    }

    pub async fn commit(self) -> Result<()> {
        match self.inner {
            ClaimInner::Sqlite(_) => Ok(()),
            #[cfg(feature = "postgres")]
            ClaimInner::Postgres(tx) => {
                tx.commit().await?;
                Ok(())
            }
        }
    }
}
