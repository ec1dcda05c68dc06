mod common;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Timelike};
use common::{date, fake_routine, seed_agent, setup_store, test_config};
use post_ops::adapters::{
    FakeTargetPostSource, FakeWebSearchClient, FakeXSearchClient, PlatformClient, WebFetchClient,
};
use post_ops::domain::{
    ActionType, AgentStatus, DailyUsage, ExternalPost, ExternalPostMetrics,
    MetricsCollectionType, PostOpsError, PostType,
};
use post_ops::worker::DailyRoutine;
use std::sync::Arc;

fn happy_config(log_dir: &tempfile::TempDir) -> post_ops::Config {
    let mut config = test_config(log_dir);
    config.worker.posts_per_day = Some(4);
    config.plan.thread_ratio = 0.25;
    config.plan.reply_ratio = 0.25;
    config.plan.quote_ratio = 0.25;
    config
}

#[tokio::test]
async fn test_happy_path_daily_routine() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    seed_agent(&store, 92, AgentStatus::Active).await;

    let routine = fake_routine(store.clone(), happy_config(&log_dir));
    let outcome = routine.run(92, date(2026, 1, 10)).await.unwrap();

    assert_eq!(outcome.status, "success");
    assert_eq!(outcome.target_date, date(2026, 1, 8));
    assert_eq!(outcome.posts, 3);
    assert_eq!(outcome.confirmed_metrics_created, 3);
    assert!(outcome.log_path.as_ref().unwrap().exists());

    // Four planned posts on 2026-01-09 (UTC worker tz) in 5-minute steps.
    let posts = store.list_agent_posts(92).await.unwrap();
    let planned: Vec<_> = posts
        .iter()
        .filter(|post| post.posted_at.is_none() && post.scheduled_at.is_some())
        .collect();
    assert_eq!(planned.len(), 4);
    let mut minutes: Vec<u32> = planned
        .iter()
        .map(|post| {
            let at = post.scheduled_at.unwrap();
            assert_eq!(at.date_naive(), date(2026, 1, 9));
            assert_eq!(at.hour(), 9);
            at.minute()
        })
        .collect();
    minutes.sort_unstable();
    assert_eq!(minutes, vec![0, 5, 10, 15]);

    let types: std::collections::HashSet<PostType> =
        planned.iter().map(|post| post.post_type).collect();
    assert!(types.contains(&PostType::Tweet));
    assert!(types.contains(&PostType::Thread));

    assert!(store
        .get_pdca(92, date(2026, 1, 8))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_rerun_is_idempotent_for_metrics_and_plans() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    seed_agent(&store, 93, AgentStatus::Active).await;

    let routine = fake_routine(store.clone(), happy_config(&log_dir));
    routine.run(93, date(2026, 1, 10)).await.unwrap();
    let second = routine.run(93, date(2026, 1, 10)).await.unwrap();

    // Confirmed metrics are append-once per post.
    assert_eq!(second.confirmed_metrics_created, 0);
    let posts = store.list_agent_posts(93).await.unwrap();
    for post in posts.iter().filter(|post| post.external_id.is_some()) {
        assert_eq!(
            store
                .count_metrics(post.id, MetricsCollectionType::Confirmed)
                .await
                .unwrap(),
            1
        );
    }

    // Planned posts are capped at posts_per_day across reruns.
    let planned = posts
        .iter()
        .filter(|post| post.posted_at.is_none() && post.scheduled_at.is_some())
        .count();
    assert_eq!(planned, 4);
}

#[tokio::test]
async fn test_budget_exceeded_skip() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let agent = seed_agent(&store, 31, AgentStatus::Active).await;
    store
        .update_agent_budget_splits(agent.id, 2, 1, 1)
        .await
        .unwrap();

    let routine = fake_routine(store.clone(), test_config(&log_dir));
    let outcome = routine.run(31, date(2026, 1, 10)).await.unwrap();

    assert_eq!(outcome.status, "skip");
    assert_eq!(outcome.reason.as_deref(), Some("budget_exceeded"));
    assert!(store
        .get_cost_log(31, date(2026, 1, 8))
        .await
        .unwrap()
        .is_none());

    let pdca = store.get_pdca(31, date(2026, 1, 8)).await.unwrap().unwrap();
    assert_eq!(pdca.analysis.reason.as_deref(), Some("budget_exceeded"));
}

#[tokio::test]
async fn test_rate_limited_skip() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    seed_agent(&store, 41, AgentStatus::Active).await;
    let executed_at = chrono::Utc
        .with_ymd_and_hms(2026, 1, 8, 10, 0, 0)
        .single()
        .unwrap();
    for _ in 0..3 {
        store
            .insert_engagement(
                41,
                0,
                ActionType::Reply,
                "https://x.com/u/status/1",
                None,
                executed_at,
            )
            .await
            .unwrap();
    }

    let routine = fake_routine(store.clone(), test_config(&log_dir));
    let outcome = routine.run(41, date(2026, 1, 10)).await.unwrap();

    assert_eq!(outcome.status, "skip");
    assert_eq!(outcome.reason.as_deref(), Some("rate_limited"));
    assert!(store
        .get_cost_log(41, date(2026, 1, 8))
        .await
        .unwrap()
        .is_none());
}

struct MissingIdentityClient;

#[async_trait]
impl PlatformClient for MissingIdentityClient {
    async fn resolve_user_id(&self) -> post_ops::Result<String> {
        Err(PostOpsError::MissingUserId("set X_USER_ID".to_string()))
    }

    async fn list_posts(
        &self,
        _agent_id: i64,
        _target_date: NaiveDate,
    ) -> post_ops::Result<Vec<ExternalPost>> {
        Err(PostOpsError::MissingUserId("set X_USER_ID".to_string()))
    }

    async fn get_post_metrics(
        &self,
        _post: &ExternalPost,
    ) -> post_ops::Result<ExternalPostMetrics> {
        Ok(ExternalPostMetrics::default())
    }

    async fn get_daily_usage(&self, usage_date: NaiveDate) -> post_ops::Result<DailyUsage> {
        Ok(DailyUsage {
            usage_date,
            units: 0,
            raw: serde_json::Value::Null,
        })
    }
}

#[tokio::test]
async fn test_missing_user_id_skip() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    seed_agent(&store, 51, AgentStatus::Active).await;

    let routine = DailyRoutine::new(
        store.clone(),
        test_config(&log_dir),
        Arc::new(MissingIdentityClient),
        Arc::new(FakeWebSearchClient),
        Arc::new(FakeXSearchClient),
        Arc::new(FakeTargetPostSource),
        Arc::new(WebFetchClient::default()),
        None,
        None,
    );
    let outcome = routine.run(51, date(2026, 1, 10)).await.unwrap();

    assert_eq!(outcome.status, "skip");
    assert_eq!(outcome.reason.as_deref(), Some("missing_user_id"));
    assert!(outcome.log_path.as_ref().unwrap().exists());

    let pdca = store.get_pdca(51, date(2026, 1, 8)).await.unwrap().unwrap();
    assert_eq!(pdca.analysis.reason.as_deref(), Some("missing_user_id"));
    assert_eq!(
        pdca.strategy.next_action.as_deref(),
        Some("set_x_user_id")
    );
}

#[tokio::test]
async fn test_research_trail_is_persisted() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    seed_agent(&store, 61, AgentStatus::Active).await;

    let routine = fake_routine(store.clone(), test_config(&log_dir));
    routine.run(61, date(2026, 1, 10)).await.unwrap();

    let search_logs = store
        .list_search_logs(61, date(2026, 1, 8))
        .await
        .unwrap();
    // One query, two sources.
    assert_eq!(search_logs.len(), 2);
    assert!(search_logs
        .iter()
        .all(|log| !log.payload.results.is_empty()));

    let pdca = store.get_pdca(61, date(2026, 1, 8)).await.unwrap().unwrap();
    let search = pdca.analytics_summary.search.unwrap();
    assert_eq!(search.count, 2);
    assert!(search.skipped.is_empty());
}

#[tokio::test]
async fn test_bootstraps_unknown_agent() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();

    let routine = fake_routine(store.clone(), test_config(&log_dir));
    let outcome = routine.run(777, date(2026, 1, 10)).await.unwrap();

    assert_eq!(outcome.status, "success");
    let agent = store.get_agent(777).await.unwrap().unwrap();
    assert_eq!(agent.status, AgentStatus::Active);
    assert!(store.get_account(agent.account_id).await.unwrap().is_some());
}
