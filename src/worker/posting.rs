//! Post claim & publish worker.
//!
//! Claims due posts through the store's locking primitive, walks each post
//! through the guard / rate / dedupe / budget / target-URL gates, publishes
//! through the poster adapter and marks the row posted with a
//! compare-and-swap. No error crosses a per-post boundary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::adapters::{extract_tweet_id, FakePoster, Poster, RealPoster, UsageClient};
use crate::config::Config;
use crate::controls::{
    read_int_toggle, BudgetLedger, GuardManager, RateLimiter, AUTO_STOP_THRESHOLD,
    DEFAULT_ENGAGEMENT_DAILY_LIMIT,
};
use crate::domain::{
    ActionType, AuditStatus, DailyPdca, ErrorPayload, Post, PostOpsError, PostType, Result,
};
use crate::oauth::TokenProvider;
use crate::storage::{ClaimedBatch, Store};
use crate::worker::reconcile::UsageReconciler;

const POSTING_SOURCE: &str = "posting_jobs";
const POSTING_EVENT: &str = "posting";
const OAUTH_SOURCE: &str = "oauth";
const REFRESH_EVENT: &str = "refresh";

/// Per-post outcome returned to callers and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct PostingResult {
    pub post_id: i64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl PostingResult {
    fn posted(post_id: i64, external_id: String) -> Self {
        Self {
            post_id,
            status: "posted".to_string(),
            reason: None,
            external_id: Some(external_id),
            error: None,
        }
    }

    fn skipped(post_id: i64, reason: &str) -> Self {
        Self {
            post_id,
            status: "skipped".to_string(),
            reason: Some(reason.to_string()),
            external_id: None,
            error: None,
        }
    }

    fn failed(post_id: i64, error: ErrorPayload) -> Self {
        Self {
            post_id,
            status: "failed".to_string(),
            reason: None,
            external_id: None,
            error: Some(error),
        }
    }
}

/// Periodic publisher of due scheduled posts.
pub struct PostingWorker {
    store: Store,
    config: Config,
    poster_override: Option<Arc<dyn Poster>>,
    token_provider: Option<TokenProvider>,
    usage_client: Option<Arc<dyn UsageClient>>,
}

impl PostingWorker {
    pub fn new(store: Store, config: Config) -> Self {
        Self {
            store,
            config,
            poster_override: None,
            token_provider: None,
            usage_client: None,
        }
    }

    /// Replace the poster adapter (tests and one-shot runs).
    pub fn with_poster(mut self, poster: Arc<dyn Poster>) -> Self {
        self.poster_override = Some(poster);
        self
    }

    /// Token provider for real-platform mode.
    pub fn with_token_provider(mut self, provider: TokenProvider) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn with_usage_client(mut self, client: Arc<dyn UsageClient>) -> Self {
        self.usage_client = Some(client);
        self
    }

    /// Run one posting batch at `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<Vec<PostingResult>> {
        let today = now.date_naive();
        let guard = GuardManager::new(self.store.clone());
        let mut batch = self
            .store
            .claim_due_posts(now, self.config.worker.posting_batch_size)
            .await?;
        let posts = batch.take_posts();
        let mut results: Vec<PostingResult> = Vec::new();
        let mut engagement_attempts: i64 = 0;

        let poster = self
            .acquire_poster(&guard, &posts, now, today, &mut results)
            .await?;

        for post in &posts {
            if post.posted_at.is_some() {
                continue;
            }
            if results
                .iter()
                .any(|entry| entry.post_id == post.id && entry.status == "skipped")
            {
                continue;
            }

            match self
                .process_post(
                    &guard,
                    poster.as_ref(),
                    &mut batch,
                    post,
                    now,
                    today,
                    &mut engagement_attempts,
                )
                .await
            {
                Ok(Some(result)) => results.push(result),
                // Lost the CAS race: another worker published it.
                Ok(None) => {}
                Err(err) => {
                    let result = self.handle_post_error(&guard, post, today, now, err).await?;
                    results.push(result);
                }
            }
        }

        batch.commit().await?;

        if self.config.toggles.posting_usage_reconcile {
            self.reconcile_usage(&guard, today).await?;
        }

        Ok(results)
    }

    /// For real-platform mode, mint one access token per affected agent
    /// before the batch; refresh failures are audited, may arm auto-stop and
    /// skip the agent's posts.
    async fn acquire_poster(
        &self,
        guard: &GuardManager,
        posts: &[Post],
        now: DateTime<Utc>,
        today: NaiveDate,
        results: &mut Vec<PostingResult>,
    ) -> Result<Arc<dyn Poster>> {
        if let Some(poster) = &self.poster_override {
            return Ok(poster.clone());
        }
        if !self.config.toggles.use_real_x {
            return Ok(Arc::new(FakePoster::new()));
        }
        let Some(provider) = &self.token_provider else {
            return Err(PostOpsError::config(
                "token provider required when USE_REAL_X=1",
            ));
        };

        let mut tokens: HashMap<i64, String> = HashMap::new();
        for post in posts {
            if post.posted_at.is_some() || tokens.contains_key(&post.agent_id) {
                continue;
            }
            let Some(agent) = self.store.get_agent(post.agent_id).await? else {
                continue;
            };
            if !guard.is_agent_runnable(&agent, now) {
                let reason = guard.skip_reason(&agent);
                guard
                    .record_audit(
                        agent.id,
                        today,
                        POSTING_SOURCE,
                        POSTING_EVENT,
                        AuditStatus::Skipped,
                        Some(&reason),
                        serde_json::json!({"post_id": post.id}),
                    )
                    .await?;
                results.push(PostingResult::skipped(post.id, &reason));
                continue;
            }

            match provider.token_for_account(agent.account_id, now).await {
                Ok(token) => {
                    tokens.insert(post.agent_id, token);
                }
                Err(_) => {
                    self.append_pdca_error(
                        post.agent_id,
                        today,
                        ErrorPayload::new("XAuthRefreshError", "x_auth_refresh_failed"),
                    )
                    .await?;
                    guard
                        .record_audit(
                            post.agent_id,
                            today,
                            OAUTH_SOURCE,
                            REFRESH_EVENT,
                            AuditStatus::Failed,
                            Some("x_auth_refresh_failed"),
                            serde_json::json!({"post_id": post.id}),
                        )
                        .await?;
                    if guard
                        .consecutive_failures(post.agent_id, OAUTH_SOURCE, REFRESH_EVENT)
                        .await?
                        >= AUTO_STOP_THRESHOLD
                    {
                        guard
                            .maybe_auto_stop(
                                post.agent_id,
                                now,
                                "auto_anomaly_oauth_refresh_failures",
                                OAUTH_SOURCE,
                                serde_json::json!({"threshold": AUTO_STOP_THRESHOLD}),
                            )
                            .await?;
                    }
                    results.push(PostingResult::skipped(post.id, "x_auth_refresh_failed"));
                }
            }
        }

        Ok(Arc::new(RealPoster::new(tokens)))
    }

    /// One post through the gate chain. `Ok(None)` means the post was taken
    /// by another worker and produces no result entry.
    #[allow(clippy::too_many_arguments)]
    async fn process_post(
        &self,
        guard: &GuardManager,
        poster: &dyn Poster,
        batch: &mut ClaimedBatch,
        post: &Post,
        now: DateTime<Utc>,
        today: NaiveDate,
        engagement_attempts: &mut i64,
    ) -> Result<Option<PostingResult>> {
        let agent = self
            .store
            .get_agent(post.agent_id)
            .await?
            .ok_or_else(|| PostOpsError::NotFound(format!("agent {}", post.agent_id)))?;

        if !guard.is_agent_runnable(&agent, now) {
            let reason = guard.skip_reason(&agent);
            guard
                .record_audit(
                    agent.id,
                    today,
                    POSTING_SOURCE,
                    POSTING_EVENT,
                    AuditStatus::Skipped,
                    Some(&reason),
                    serde_json::json!({"post_id": post.id}),
                )
                .await?;
            return Ok(Some(PostingResult::skipped(post.id, &reason)));
        }

        if post.post_type.is_engagement() {
            let limiter = RateLimiter::new(
                self.store.clone(),
                post.agent_id,
                today,
                read_int_toggle(
                    &agent,
                    "reply_quote_daily_max",
                    DEFAULT_ENGAGEMENT_DAILY_LIMIT,
                ),
            );
            let action = match post.post_type {
                PostType::Reply => ActionType::Reply,
                _ => ActionType::QuoteRt,
            };
            if limiter.is_limited(action, *engagement_attempts + 1).await? {
                self.append_pdca_error(
                    post.agent_id,
                    today,
                    ErrorPayload::new("rate_limited", "reply_quote_daily_limit_reached"),
                )
                .await?;
                guard
                    .record_audit(
                        agent.id,
                        today,
                        POSTING_SOURCE,
                        POSTING_EVENT,
                        AuditStatus::Skipped,
                        Some("rate_limited"),
                        serde_json::json!({
                            "post_id": post.id,
                            "type": post.post_type.as_str(),
                        }),
                    )
                    .await?;
                return Ok(Some(PostingResult::skipped(post.id, "rate_limited")));
            }
            *engagement_attempts += 1;
        }

        // Stamp dedupe fields before checking for a published twin; a
        // unique-constraint hit surfaces as DuplicateContent.
        let content_hash = post.content_hash.clone().unwrap_or_else(|| {
            crate::domain::build_post_content_hash(&post.content, post.thread_parts.as_deref())
        });
        let bucket_date = post.content_bucket_date.unwrap_or(today);
        if post.content_hash.is_none() || post.content_bucket_date.is_none() {
            self.store
                .set_post_dedupe_fields(post.id, &content_hash, bucket_date)
                .await?;
        }
        if let Some(duplicate_id) = self
            .store
            .find_posted_duplicate(post.agent_id, &content_hash, bucket_date, post.id)
            .await?
        {
            guard
                .record_audit(
                    agent.id,
                    today,
                    POSTING_SOURCE,
                    POSTING_EVENT,
                    AuditStatus::Skipped,
                    Some("duplicate_content"),
                    serde_json::json!({
                        "post_id": post.id,
                        "duplicate_post_id": duplicate_id,
                    }),
                )
                .await?;
            return Ok(Some(PostingResult::skipped(post.id, "duplicate_content")));
        }

        let mut ledger = BudgetLedger::for_agent(self.store.clone(), &agent, today);
        ledger
            .reserve(self.config.costs.posting_x, rust_decimal::Decimal::ZERO)
            .await?;

        let external_id = self.dispatch(poster, post).await?;

        if !batch.mark_posted(post.id, &external_id, now).await? {
            return Ok(None);
        }
        ledger.commit().await?;

        if post.post_type.is_engagement() {
            let action = match post.post_type {
                PostType::Reply => ActionType::Reply,
                _ => ActionType::QuoteRt,
            };
            self.store
                .insert_engagement(
                    post.agent_id,
                    0,
                    action,
                    post.target_post_url.as_deref().unwrap_or_default(),
                    Some(&post.content),
                    now,
                )
                .await?;
        }

        guard
            .record_audit(
                agent.id,
                today,
                POSTING_SOURCE,
                POSTING_EVENT,
                AuditStatus::Success,
                None,
                serde_json::json!({"post_id": post.id, "external_id": external_id}),
            )
            .await?;
        info!(post_id = post.id, external_id = %external_id, "post published");
        Ok(Some(PostingResult::posted(post.id, external_id)))
    }

    /// Typed publish dispatch; validates engagement target URLs first so an
    /// invalid URL never reaches the adapter.
    async fn dispatch(&self, poster: &dyn Poster, post: &Post) -> Result<String> {
        match post.post_type {
            PostType::Tweet | PostType::Poll => {
                poster.post_text(post.agent_id, &post.content).await
            }
            PostType::Thread => {
                let parts: Vec<String> = post
                    .thread_parts
                    .clone()
                    .unwrap_or_else(|| vec![post.content.clone()])
                    .into_iter()
                    .filter(|part| !part.trim().is_empty())
                    .collect();
                poster.post_thread(post.agent_id, &parts).await
            }
            PostType::Reply | PostType::QuoteRt => {
                let target_url = post
                    .target_post_url
                    .as_deref()
                    .ok_or_else(|| PostOpsError::internal("target_post_url_required"))?;
                if extract_tweet_id(target_url).is_none() {
                    return Err(PostOpsError::InvalidTargetUrl(target_url.to_string()));
                }
                if post.post_type == PostType::Reply {
                    poster
                        .post_reply(post.agent_id, target_url, &post.content)
                        .await
                } else {
                    poster
                        .post_quote_rt(post.agent_id, target_url, &post.content)
                        .await
                }
            }
        }
    }

    /// Translate a per-post error into an audit row, PDCA note and result
    /// entry; generic failures feed the auto-stop window.
    async fn handle_post_error(
        &self,
        guard: &GuardManager,
        post: &Post,
        today: NaiveDate,
        now: DateTime<Utc>,
        err: PostOpsError,
    ) -> Result<PostingResult> {
        let payload = ErrorPayload::new(err.kind(), err.to_string());
        error!(post_id = post.id, error = %err, "posting job error");

        match &err {
            PostOpsError::InvalidTargetUrl(_) => {
                self.append_pdca_error(post.agent_id, today, payload.clone())
                    .await?;
                guard
                    .record_audit(
                        post.agent_id,
                        today,
                        POSTING_SOURCE,
                        POSTING_EVENT,
                        AuditStatus::Skipped,
                        Some("invalid_target_url"),
                        serde_json::json!({"post_id": post.id}),
                    )
                    .await?;
                Ok(PostingResult::skipped(post.id, "invalid_target_url"))
            }
            PostOpsError::DuplicateContent => {
                guard
                    .record_audit(
                        post.agent_id,
                        today,
                        POSTING_SOURCE,
                        POSTING_EVENT,
                        AuditStatus::Skipped,
                        Some("duplicate_content"),
                        serde_json::json!({"post_id": post.id}),
                    )
                    .await?;
                Ok(PostingResult::skipped(post.id, "duplicate_content"))
            }
            PostOpsError::BudgetExceeded { .. } => {
                self.append_pdca_error(post.agent_id, today, payload.clone())
                    .await?;
                guard
                    .record_audit(
                        post.agent_id,
                        today,
                        POSTING_SOURCE,
                        POSTING_EVENT,
                        AuditStatus::Failed,
                        Some("budget_exceeded"),
                        serde_json::json!({"post_id": post.id}),
                    )
                    .await?;
                Ok(PostingResult::failed(post.id, payload))
            }
            _ => {
                self.append_pdca_error(post.agent_id, today, payload.clone())
                    .await?;
                guard
                    .record_audit(
                        post.agent_id,
                        today,
                        POSTING_SOURCE,
                        POSTING_EVENT,
                        AuditStatus::Failed,
                        Some(payload.kind.as_str()),
                        serde_json::json!({"post_id": post.id}),
                    )
                    .await?;
                if guard
                    .consecutive_failures(post.agent_id, POSTING_SOURCE, POSTING_EVENT)
                    .await?
                    >= AUTO_STOP_THRESHOLD
                {
                    guard
                        .maybe_auto_stop(
                            post.agent_id,
                            now,
                            "auto_anomaly_posting_failures",
                            POSTING_SOURCE,
                            serde_json::json!({"threshold": AUTO_STOP_THRESHOLD}),
                        )
                        .await?;
                }
                Ok(PostingResult::failed(post.id, payload))
            }
        }
    }

    async fn append_pdca_error(
        &self,
        agent_id: i64,
        date: NaiveDate,
        payload: ErrorPayload,
    ) -> Result<()> {
        let mut pdca = match self.store.get_pdca(agent_id, date).await? {
            Some(pdca) => pdca,
            None => {
                let mut fresh = DailyPdca::new(agent_id, date);
                fresh.analysis.status = Some("posting_failed".to_string());
                fresh
            }
        };
        pdca.analytics_summary.posting_errors.push(payload);
        self.store.upsert_pdca(&pdca).await
    }

    async fn reconcile_usage(&self, guard: &GuardManager, today: NaiveDate) -> Result<()> {
        let reconciler =
            UsageReconciler::new(self.store.clone(), self.config.platform.unit_price);
        let report = reconciler
            .run(self.usage_client.as_deref(), today)
            .await;
        let (status, reason) = if report.x_usage_reconciled {
            (AuditStatus::Success, None)
        } else if report.usage_fetch_failed {
            (AuditStatus::Failed, report.usage_error.as_deref())
        } else {
            (AuditStatus::Skipped, Some("usage_disabled"))
        };
        guard
            .record_audit(
                0,
                today,
                "usage",
                "reconcile",
                status,
                reason,
                serde_json::json!({"x_usage_reconciled": report.x_usage_reconciled}),
            )
            .await
    }
}
