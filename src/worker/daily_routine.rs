//! Per-agent daily pipeline: observe yesterday's posts, research, fetch and
//! summarize, plan the next day, account for it all and leave a PDCA trail.
//!
//! Sub-step failures are captured into the PDCA artifact and audit log; only
//! fatal adapter errors propagate to the caller.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::adapters::{
    PlatformClient, SearchClient, Summarizer, TargetPostSource, UsageClient, WebFetcher,
};
use crate::config::Config;
use crate::controls::{
    read_int_toggle, BudgetLedger, BudgetStatus, FetchLimiter, GuardManager, RateLimiter,
    RateStatus, SearchLimiter, DEFAULT_ENGAGEMENT_DAILY_LIMIT,
};
use crate::domain::{
    ActionType, Agent, AuditStatus, CreatedPostRef, DailyPdca, FetchLog, FetchStatus,
    FetchSummaryBlock, MetricsCollectionType, PostOpsError, Result, SearchLogPayload,
    SearchResult, SearchSource, SearchSummary, SkippedEntry,
};
use crate::storage::Store;
use crate::worker::planner;
use crate::worker::reconcile::UsageReconciler;
use crate::worker::run_log;

const ROUTINE_SOURCE: &str = "daily_routine";

/// Days between the base date and the day whose confirmed metrics the
/// platform has finalized.
pub const METRICS_LAG_DAYS: i64 = 2;

/// Keywords in a query that signal the page itself should be read.
const FETCH_KEYWORDS: [&str; 5] = ["方法", "手順", "比較", "料金", "変更"];

/// Outcome of one agent-day run.
#[derive(Debug, Clone, Serialize)]
pub struct RoutineOutcome {
    pub agent_id: i64,
    pub target_date: NaiveDate,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub posts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    pub confirmed_metrics_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_status: Option<BudgetStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_status: Option<RateStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned_posts: Vec<CreatedPostRef>,
}

impl RoutineOutcome {
    fn skip(agent_id: i64, target_date: NaiveDate, reason: &str) -> Self {
        Self {
            agent_id,
            target_date,
            status: "skip".to_string(),
            reason: Some(reason.to_string()),
            posts: 0,
            log_path: None,
            confirmed_metrics_created: 0,
            budget_status: None,
            rate_status: None,
            planned_posts: Vec::new(),
        }
    }
}

struct ResearchRecord {
    source: SearchSource,
    query: String,
    results: Vec<SearchResult>,
}

struct ResearchOutcome {
    records: Vec<ResearchRecord>,
    skipped: Vec<SkippedEntry>,
}

/// The observation → research → planning pipeline for one agent.
pub struct DailyRoutine {
    store: Store,
    config: Config,
    platform: Arc<dyn PlatformClient>,
    web_search: Arc<dyn SearchClient>,
    x_search: Arc<dyn SearchClient>,
    target_source: Arc<dyn TargetPostSource>,
    fetcher: Arc<dyn WebFetcher>,
    summarizer: Option<Arc<dyn Summarizer>>,
    usage_client: Option<Arc<dyn UsageClient>>,
}

impl DailyRoutine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        config: Config,
        platform: Arc<dyn PlatformClient>,
        web_search: Arc<dyn SearchClient>,
        x_search: Arc<dyn SearchClient>,
        target_source: Arc<dyn TargetPostSource>,
        fetcher: Arc<dyn WebFetcher>,
        summarizer: Option<Arc<dyn Summarizer>>,
        usage_client: Option<Arc<dyn UsageClient>>,
    ) -> Self {
        Self {
            store,
            config,
            platform,
            web_search,
            x_search,
            target_source,
            fetcher,
            summarizer,
            usage_client,
        }
    }

    fn posts_per_day(&self, agent: &Agent) -> usize {
        match self.config.worker.posts_per_day {
            Some(n) => n as usize,
            None => read_int_toggle(agent, "posts_per_day", 1).max(0) as usize,
        }
    }

    fn research_queries(&self, agent_id: i64, target_date: NaiveDate) -> Vec<String> {
        let topic = self
            .config
            .search
            .topic
            .clone()
            .unwrap_or_else(|| format!("agent-{agent_id}-insights"));
        vec![format!("{topic} {target_date}")]
    }

    /// Run the full pipeline for `(agent_id, base_date)`. The target date is
    /// `base_date − 2 days` (confirmed-metrics availability lag).
    pub async fn run(&self, agent_id: i64, base_date: NaiveDate) -> Result<RoutineOutcome> {
        let target_date = base_date - chrono::Duration::days(METRICS_LAG_DAYS);
        let now = Utc::now();
        let guard = GuardManager::new(self.store.clone());
        let agent = self.store.ensure_agent(agent_id).await?;

        // 1. Guard gate.
        if !guard.is_agent_runnable(&agent, now) {
            let reason = guard.skip_reason(&agent);
            guard
                .record_audit(
                    agent_id,
                    target_date,
                    ROUTINE_SOURCE,
                    "execution_skip",
                    AuditStatus::Skipped,
                    Some(&reason),
                    serde_json::json!({"status": agent.status.as_str()}),
                )
                .await?;
            return Ok(RoutineOutcome::skip(agent_id, target_date, &reason));
        }

        let mut ledger = BudgetLedger::for_agent(self.store.clone(), &agent, target_date);
        let rate_limiter = RateLimiter::new(
            self.store.clone(),
            agent_id,
            target_date,
            read_int_toggle(
                &agent,
                "reply_quote_daily_max",
                DEFAULT_ENGAGEMENT_DAILY_LIMIT,
            ),
        );

        // 2. Pre-flight observation reservation.
        let routine_x = self.config.costs.routine_x;
        let routine_llm = self.config.costs.routine_llm;
        match ledger.reserve(routine_x, routine_llm).await {
            Ok(()) => {}
            Err(PostOpsError::BudgetExceeded { .. }) => {
                return self
                    .skip_with_pdca(
                        agent_id,
                        target_date,
                        "budget_exceeded",
                        "wait",
                        &ledger,
                        &rate_limiter,
                    )
                    .await;
            }
            Err(other) => return Err(other),
        }

        // 3. Engagement rate gate.
        if rate_limiter.is_limited(ActionType::Reply, 1).await? {
            return self
                .skip_with_pdca(agent_id, target_date, "rate_limited", "wait", &ledger, &rate_limiter)
                .await;
        }

        // 4. External posts ingest with confirmed metrics.
        let external_posts = match self.platform.list_posts(agent_id, target_date).await {
            Ok(posts) => posts,
            Err(PostOpsError::MissingUserId(message)) => {
                return self
                    .skip_missing_user_id(agent_id, base_date, target_date, &message)
                    .await;
            }
            Err(other) => return Err(other),
        };

        let mut inserted_metrics = 0usize;
        let mut metric_rows: Vec<Value> = Vec::new();
        let mut post_ids: Vec<i64> = Vec::new();
        let mut impressions_unavailable = false;

        for external_post in &external_posts {
            let post = self.store.upsert_external_post(agent_id, external_post).await?;
            post_ids.push(post.id);
            let metrics = self.platform.get_post_metrics(external_post).await?;
            if metrics.impressions_unavailable {
                impressions_unavailable = true;
            }
            if !self
                .store
                .has_metrics(post.id, MetricsCollectionType::Confirmed)
                .await?
            {
                self.store
                    .insert_post_metrics(post.id, MetricsCollectionType::Confirmed, now, &metrics)
                    .await?;
                inserted_metrics += 1;
            }
            metric_rows.push(serde_json::to_value(&metrics)?);
        }

        let mut pdca = self
            .store
            .get_pdca(agent_id, target_date)
            .await?
            .unwrap_or_else(|| DailyPdca::new(agent_id, target_date));
        pdca.analytics_summary.target_date = Some(target_date);
        pdca.analytics_summary.post_count = Some(external_posts.len());
        pdca.analytics_summary.confirmed_metrics_created = Some(inserted_metrics);
        pdca.analytics_summary.impressions_unavailable = Some(impressions_unavailable);
        pdca.analysis.status = Some("completed".to_string());
        pdca.strategy.next_action = Some("continue".to_string());
        if pdca.posts_created.is_empty() {
            pdca.posts_created = external_posts
                .iter()
                .map(|post| CreatedPostRef {
                    id: None,
                    external_id: Some(post.external_id.clone()),
                    scheduled_at: None,
                    post_type: None,
                })
                .collect();
        }

        // 5. Target-post harvest.
        self.harvest_targets(&guard, agent_id, target_date, &mut ledger)
            .await?;

        // 6. Research.
        let research = self
            .run_daily_research(&agent, agent_id, target_date, &mut ledger)
            .await?;
        pdca.analytics_summary.search = Some(SearchSummary {
            count: research.records.len(),
            last_queries: research
                .records
                .iter()
                .rev()
                .take(3)
                .rev()
                .map(|record| record.query.clone())
                .collect(),
            skipped: research.skipped.clone(),
        });

        // 7. Fetch & summarize.
        let fetch_block = self
            .fetch_and_summarize(&agent, agent_id, target_date, &research, &mut ledger)
            .await?;
        pdca.analytics_summary.fetch = Some(fetch_block);

        // 8. Plan next-day posts.
        let posts_per_day = self.posts_per_day(&agent);
        let mut planned_posts = Vec::new();
        match planner::build_post_drafts(
            &self.store,
            agent_id,
            target_date,
            posts_per_day,
            &mut ledger,
            &self.config.plan,
            self.config.costs.plan_llm,
        )
        .await
        {
            Ok(plan) => {
                planned_posts = planner::create_next_day_posts(
                    &self.store,
                    agent_id,
                    target_date,
                    posts_per_day,
                    &plan.drafts,
                    &self.config.worker,
                )
                .await?;
                pdca.posts_created.extend(planned_posts.iter().cloned());
            }
            Err(PostOpsError::BudgetExceeded { .. }) => {
                warn!(agent_id, "plan step skipped: budget exceeded");
                pdca.analytics_summary
                    .posting_errors
                    .push(crate::domain::ErrorPayload::new(
                        "budget_exceeded",
                        "plan_budget_exceeded",
                    ));
            }
            Err(other) => return Err(other),
        }

        // 9. Ledger commit.
        ledger.commit().await?;

        // 10. Usage reconcile.
        let reconciler = UsageReconciler::new(self.store.clone(), self.config.platform.unit_price);
        let usage_report = reconciler
            .run(self.usage_client.as_deref(), target_date)
            .await;
        let (usage_status, usage_reason) = if usage_report.x_usage_reconciled {
            (AuditStatus::Success, None)
        } else if usage_report.usage_fetch_failed {
            pdca.analysis.usage_fetch_failed = Some(true);
            (AuditStatus::Failed, usage_report.usage_error.as_deref())
        } else {
            (AuditStatus::Skipped, Some("usage_disabled"))
        };
        guard
            .record_audit(
                agent_id,
                target_date,
                "usage",
                "reconcile",
                usage_status,
                usage_reason,
                serde_json::json!({"x_usage_reconciled": usage_report.x_usage_reconciled}),
            )
            .await?;

        // 11. Persist PDCA and the run log.
        self.store.upsert_pdca(&pdca).await?;

        let budget_status = ledger.status().await?;
        let rate_status = rate_limiter.status(ActionType::Reply).await?;

        let log_payload = serde_json::json!({
            "agent_id": agent_id,
            "base_date": base_date,
            "target_date": target_date,
            "status": "success",
            "posts": post_ids,
            "metrics": metric_rows,
            "confirmed_metrics_created": inserted_metrics,
            "cost": {
                "x_api_cost": routine_x.to_string(),
                "llm_cost": routine_llm.to_string(),
                "total": (routine_x + routine_llm).to_string(),
            },
            "planned_posts": planned_posts,
            "research": {
                "count": research.records.len(),
                "skipped": research.skipped,
            },
            "fetch": pdca.analytics_summary.fetch.clone(),
        });
        let log_path = run_log::write_daily_log(
            &self.config.worker.log_dir,
            agent_id,
            target_date,
            &log_payload,
        )?;

        Ok(RoutineOutcome {
            agent_id,
            target_date,
            status: "success".to_string(),
            reason: None,
            posts: post_ids.len(),
            log_path: Some(log_path),
            confirmed_metrics_created: inserted_metrics,
            budget_status: Some(budget_status),
            rate_status: Some(rate_status),
            planned_posts,
        })
    }

    async fn skip_with_pdca(
        &self,
        agent_id: i64,
        target_date: NaiveDate,
        reason: &str,
        next_action: &str,
        ledger: &BudgetLedger,
        rate_limiter: &RateLimiter,
    ) -> Result<RoutineOutcome> {
        if self.store.get_pdca(agent_id, target_date).await?.is_none() {
            let pdca = DailyPdca::skip(agent_id, target_date, reason, next_action);
            self.store.upsert_pdca(&pdca).await?;
        }
        let mut outcome = RoutineOutcome::skip(agent_id, target_date, reason);
        outcome.budget_status = Some(ledger.status().await?);
        outcome.rate_status = Some(rate_limiter.status(ActionType::Reply).await?);
        Ok(outcome)
    }

    async fn skip_missing_user_id(
        &self,
        agent_id: i64,
        base_date: NaiveDate,
        target_date: NaiveDate,
        message: &str,
    ) -> Result<RoutineOutcome> {
        let mut pdca = DailyPdca::skip(agent_id, target_date, "missing_user_id", "set_x_user_id");
        pdca.analytics_summary.message = Some(message.to_string());
        self.store.upsert_pdca(&pdca).await?;

        let log_path = run_log::write_daily_log(
            &self.config.worker.log_dir,
            agent_id,
            target_date,
            &serde_json::json!({
                "agent_id": agent_id,
                "base_date": base_date,
                "target_date": target_date,
                "status": "skip",
                "reason": "missing_user_id",
                "message": message,
            }),
        )?;

        let mut outcome = RoutineOutcome::skip(agent_id, target_date, "missing_user_id");
        outcome.log_path = Some(log_path);
        Ok(outcome)
    }

    /// Bounded harvest of target-post candidates from the configured
    /// handles; budget exhaustion skips the step, audited not fatal.
    async fn harvest_targets(
        &self,
        guard: &GuardManager,
        agent_id: i64,
        target_date: NaiveDate,
        ledger: &mut BudgetLedger,
    ) -> Result<()> {
        let handles = &self.config.platform.target_handles;
        if handles.is_empty() {
            return Ok(());
        }

        match ledger
            .reserve(self.config.costs.target_post_fetch, Decimal::ZERO)
            .await
        {
            Ok(()) => {}
            Err(PostOpsError::BudgetExceeded { .. }) => {
                guard
                    .record_audit(
                        agent_id,
                        target_date,
                        ROUTINE_SOURCE,
                        "target_harvest",
                        AuditStatus::Skipped,
                        Some("budget_exceeded"),
                        Value::Object(Default::default()),
                    )
                    .await?;
                return Ok(());
            }
            Err(other) => return Err(other),
        }

        let targets = match self
            .target_source
            .list_target_posts(agent_id, handles, self.config.platform.target_posts_limit)
            .await
        {
            Ok(targets) => targets,
            Err(err) => {
                guard
                    .record_audit(
                        agent_id,
                        target_date,
                        ROUTINE_SOURCE,
                        "target_harvest",
                        AuditStatus::Failed,
                        Some(err.kind()),
                        serde_json::json!({"message": err.to_string()}),
                    )
                    .await?;
                return Ok(());
            }
        };

        for target in &targets {
            self.store
                .insert_target_candidate(agent_id, target_date, target)
                .await?;
        }
        Ok(())
    }

    /// Research step: per-query x- and web-source searches, each behind the
    /// search limiter and a cost reservation.
    async fn run_daily_research(
        &self,
        _agent: &Agent,
        agent_id: i64,
        target_date: NaiveDate,
        ledger: &mut BudgetLedger,
    ) -> Result<ResearchOutcome> {
        let limiter = SearchLimiter::new(
            self.store.clone(),
            agent_id,
            target_date,
            self.config.search.x_search_max,
            self.config.search.web_search_max,
        );
        let top_k = self.config.search.top_k;
        let snippet_limit = self.config.search.snippet_limit;

        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for query in self.research_queries(agent_id, target_date) {
            for (source, client, cost) in [
                (
                    SearchSource::X,
                    &self.x_search,
                    (self.config.costs.x_search, Decimal::ZERO),
                ),
                (
                    SearchSource::Web,
                    &self.web_search,
                    // Web search is tracked in the LLM bucket.
                    (Decimal::ZERO, self.config.costs.web_search),
                ),
            ] {
                if limiter.is_limited(source, 1).await? {
                    skipped.push(SkippedEntry {
                        source: source.as_str().to_string(),
                        query: Some(query.clone()),
                        url: None,
                        reason: "search_rate_limited".to_string(),
                    });
                    continue;
                }
                match ledger.reserve(cost.0, cost.1).await {
                    Ok(()) => {}
                    Err(PostOpsError::BudgetExceeded { .. }) => {
                        skipped.push(SkippedEntry {
                            source: source.as_str().to_string(),
                            query: Some(query.clone()),
                            url: None,
                            reason: "search_budget_exceeded".to_string(),
                        });
                        continue;
                    }
                    Err(other) => return Err(other),
                }

                match client.search(&query, top_k).await {
                    Ok(results) => {
                        let normalized: Vec<SearchResult> = results
                            .into_iter()
                            .map(|result| SearchResult {
                                title: result.title,
                                snippet: result.snippet.chars().take(snippet_limit).collect(),
                                url: result.url,
                            })
                            .collect();
                        let payload = SearchLogPayload {
                            results: normalized.clone(),
                            extra: Default::default(),
                        };
                        self.store
                            .insert_search_log(
                                agent_id,
                                target_date,
                                source,
                                &query,
                                &payload,
                                cost.0 + cost.1,
                            )
                            .await?;
                        records.push(ResearchRecord {
                            source,
                            query: query.clone(),
                            results: normalized,
                        });
                    }
                    Err(err) => {
                        let reason = match source {
                            SearchSource::Web => "gemini_search_failed",
                            SearchSource::X => "x_search_failed",
                        };
                        warn!(agent_id, source = source.as_str(), error = %err, "search failed");
                        let mut payload = SearchLogPayload::default();
                        payload.extra.insert(
                            "failure_reason".to_string(),
                            Value::String(reason.to_string()),
                        );
                        self.store
                            .insert_search_log(
                                agent_id,
                                target_date,
                                source,
                                &query,
                                &payload,
                                cost.0 + cost.1,
                            )
                            .await?;
                        skipped.push(SkippedEntry {
                            source: source.as_str().to_string(),
                            query: Some(query.clone()),
                            url: None,
                            reason: reason.to_string(),
                        });
                    }
                }
            }
        }

        Ok(ResearchOutcome { records, skipped })
    }

    /// A query demands a page read when it carries one of the fetch
    /// keywords, or when its leading snippet is too short or elliptical to
    /// stand alone.
    fn should_fetch(query: &str, snippet: Option<&str>) -> bool {
        if FETCH_KEYWORDS.iter().any(|keyword| query.contains(keyword)) {
            return true;
        }
        match snippet {
            None => false,
            Some(snippet) => {
                snippet.chars().count() < 60
                    || snippet.contains("...")
                    || snippet.contains("詳細")
            }
        }
    }

    /// Fetch-and-summarize step over the web research records; at most one
    /// processed URL per record.
    async fn fetch_and_summarize(
        &self,
        _agent: &Agent,
        agent_id: i64,
        target_date: NaiveDate,
        research: &ResearchOutcome,
        ledger: &mut BudgetLedger,
    ) -> Result<FetchSummaryBlock> {
        let limiter = FetchLimiter::new(
            self.store.clone(),
            agent_id,
            target_date,
            self.config.search.web_fetch_max,
        );

        let mut processed = 0usize;
        let mut skipped = Vec::new();

        for record in &research.records {
            if record.source != SearchSource::Web {
                continue;
            }
            let first = record.results.first();
            if !Self::should_fetch(&record.query, first.map(|hit| hit.snippet.as_str())) {
                continue;
            }
            let Some(hit) = first else {
                continue;
            };
            let url = hit.url.clone();

            if limiter.is_limited(1).await? {
                self.store
                    .insert_fetch_log(&FetchLog {
                        id: 0,
                        agent_id,
                        date: target_date,
                        url: url.clone(),
                        status: FetchStatus::Skipped,
                        http_status: None,
                        content_type: None,
                        content_length: None,
                        extracted_text: None,
                        summary: None,
                        failure_reason: Some("fetch_rate_limited".to_string()),
                        cost_estimate: Decimal::ZERO,
                    })
                    .await?;
                skipped.push(SkippedEntry {
                    source: "web_fetch".to_string(),
                    query: Some(record.query.clone()),
                    url: Some(url),
                    reason: "fetch_rate_limited".to_string(),
                });
                continue;
            }

            let fetch_cost = self.config.costs.web_fetch_llm;
            match ledger.reserve(Decimal::ZERO, fetch_cost).await {
                Ok(()) => {}
                Err(PostOpsError::BudgetExceeded { .. }) => {
                    self.store
                        .insert_fetch_log(&FetchLog {
                            id: 0,
                            agent_id,
                            date: target_date,
                            url: url.clone(),
                            status: FetchStatus::Skipped,
                            http_status: None,
                            content_type: None,
                            content_length: None,
                            extracted_text: None,
                            summary: None,
                            failure_reason: Some("fetch_budget_exceeded".to_string()),
                            cost_estimate: Decimal::ZERO,
                        })
                        .await?;
                    skipped.push(SkippedEntry {
                        source: "web_fetch".to_string(),
                        query: Some(record.query.clone()),
                        url: Some(url),
                        reason: "fetch_budget_exceeded".to_string(),
                    });
                    continue;
                }
                Err(other) => return Err(other),
            }

            let outcome = self.fetcher.fetch(&url).await;
            let mut summary = None;
            let mut cost_estimate = fetch_cost;
            if outcome.status == FetchStatus::Succeeded {
                if let (Some(summarizer), Some(text)) =
                    (&self.summarizer, outcome.extracted_text.as_deref())
                {
                    let summarize_cost = self.config.costs.web_summarize_llm;
                    if ledger.reserve(Decimal::ZERO, summarize_cost).await.is_ok() {
                        match summarizer.summarize(text).await {
                            Ok(parsed) => {
                                cost_estimate += summarize_cost;
                                summary = Some(parsed);
                            }
                            Err(err) => {
                                warn!(agent_id, error = %err, "summarize failed");
                            }
                        }
                    }
                }
            }

            self.store
                .insert_fetch_log(&FetchLog {
                    id: 0,
                    agent_id,
                    date: target_date,
                    url: outcome.url.clone(),
                    status: outcome.status,
                    http_status: outcome.http_status,
                    content_type: outcome.content_type.clone(),
                    content_length: outcome.content_length,
                    extracted_text: outcome.extracted_text.clone(),
                    summary,
                    failure_reason: outcome.failure_reason.clone(),
                    cost_estimate,
                })
                .await?;
            processed += 1;
        }

        Ok(FetchSummaryBlock { processed, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_fetch_keyword_queries() {
        assert!(DailyRoutine::should_fetch("料金 プラン", Some("long enough snippet that stands alone and is quite descriptive")));
        assert!(DailyRoutine::should_fetch("比較 2026", None));
    }

    #[test]
    fn test_should_fetch_ambiguous_snippets() {
        assert!(DailyRoutine::should_fetch("plain query", Some("short")));
        assert!(DailyRoutine::should_fetch(
            "plain query",
            Some("trailing ellipsis means the source was truncated somewhere in the middle...")
        ));
        assert!(DailyRoutine::should_fetch(
            "plain query",
            Some("詳細はこちらをご覧ください。全体の内容が長くても詳細キーワードで取得対象になります。")
        ));
    }

    #[test]
    fn test_should_not_fetch_clear_snippets() {
        assert!(!DailyRoutine::should_fetch(
            "plain query",
            Some("a complete, self-contained snippet that is plenty long and has no ellipsis")
        ));
        assert!(!DailyRoutine::should_fetch("plain query", None));
    }
}
