mod common;

use chrono::{Duration, Utc};
use common::{date, fake_routine, seed_agent, seed_due_post, setup_store, test_config};
use post_ops::controls::GuardManager;
use post_ops::domain::{AgentStatus, AuditStatus, DailyPdca, PostType};
use post_ops::worker::PostingWorker;
use std::sync::Arc;

#[tokio::test]
async fn test_stopped_agent_is_skipped_in_daily_and_posting() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let config = test_config(&log_dir);
    seed_agent(&store, 41, AgentStatus::Stopped).await;
    seed_due_post(
        &store,
        41,
        "stopped post",
        PostType::Tweet,
        Utc::now() - Duration::minutes(5),
    )
    .await;

    let routine = fake_routine(store.clone(), config.clone());
    let daily = routine.run(41, date(2026, 1, 10)).await.unwrap();
    assert_eq!(daily.status, "skip");
    assert_eq!(daily.reason.as_deref(), Some("agent_stopped"));

    let poster = Arc::new(post_ops::adapters::FakePoster::new());
    let worker = PostingWorker::new(store.clone(), config).with_poster(poster.clone());
    let results = worker.run(Utc::now()).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, "skipped");
    assert_eq!(results[0].reason.as_deref(), Some("agent_stopped"));
    assert_eq!(poster.call_count(), 0);
}

#[tokio::test]
async fn test_paused_agent_skip_reason_carries_status() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    seed_agent(&store, 42, AgentStatus::Paused).await;

    let routine = fake_routine(store.clone(), test_config(&log_dir));
    let outcome = routine.run(42, date(2026, 1, 10)).await.unwrap();
    assert_eq!(outcome.status, "skip");
    assert_eq!(outcome.reason.as_deref(), Some("agent_status_paused"));
}

#[tokio::test]
async fn test_active_agent_with_future_stop_until_is_not_runnable() {
    let store = setup_store().await;
    let agent = seed_agent(&store, 43, AgentStatus::Active).await;
    let guard = GuardManager::new(store.clone());
    let now = Utc::now();

    let mut windowed = agent.clone();
    windowed.stop_until = Some(now + Duration::hours(1));
    assert!(!guard.is_agent_runnable(&windowed, now));

    windowed.stop_until = Some(now - Duration::hours(1));
    assert!(guard.is_agent_runnable(&windowed, now));

    assert!(guard.is_agent_runnable(&agent, now));
}

#[tokio::test]
async fn test_auto_stop_is_idempotent_per_reason() {
    let store = setup_store().await;
    seed_agent(&store, 44, AgentStatus::Active).await;
    let guard = GuardManager::new(store.clone());
    let now = Utc::now();

    guard
        .maybe_auto_stop(44, now, "auto_anomaly_posting_failures", "posting_jobs", serde_json::json!({}))
        .await
        .unwrap();
    guard
        .maybe_auto_stop(44, now, "auto_anomaly_posting_failures", "posting_jobs", serde_json::json!({}))
        .await
        .unwrap();

    let agent = store.get_agent(44).await.unwrap().unwrap();
    assert_eq!(agent.status, AgentStatus::Stopped);
    assert_eq!(
        agent.stop_reason.as_deref(),
        Some("auto_anomaly_posting_failures")
    );

    let audits = store.list_audits(44, 50).await.unwrap();
    let auto_stops = audits
        .iter()
        .filter(|audit| audit.event_type == "auto_stop")
        .count();
    assert_eq!(auto_stops, 1);
}

#[tokio::test]
async fn test_auto_stop_annotates_existing_pdca() {
    let store = setup_store().await;
    seed_agent(&store, 45, AgentStatus::Active).await;
    let guard = GuardManager::new(store.clone());
    let now = Utc::now();
    let today = now.date_naive();

    store
        .upsert_pdca(&DailyPdca::new(45, today))
        .await
        .unwrap();
    guard
        .maybe_auto_stop(45, now, "auto_anomaly_oauth_refresh_failures", "oauth", serde_json::json!({}))
        .await
        .unwrap();

    let pdca = store.get_pdca(45, today).await.unwrap().unwrap();
    let note = pdca.analytics_summary.auto_stop.unwrap();
    assert_eq!(note.reason, "auto_anomaly_oauth_refresh_failures");
    assert_eq!(note.source, "oauth");
}

#[tokio::test]
async fn test_consecutive_failure_window() {
    let store = setup_store().await;
    seed_agent(&store, 46, AgentStatus::Active).await;
    let guard = GuardManager::new(store.clone());
    let today = Utc::now().date_naive();

    let record = |status: AuditStatus| {
        let guard = &guard;
        async move {
            guard
                .record_audit(
                    46,
                    today,
                    "posting_jobs",
                    "posting",
                    status,
                    None,
                    serde_json::json!({}),
                )
                .await
                .unwrap();
        }
    };

    record(AuditStatus::Failed).await;
    record(AuditStatus::Failed).await;
    assert_eq!(
        guard
            .consecutive_failures(46, "posting_jobs", "posting")
            .await
            .unwrap(),
        0
    );

    record(AuditStatus::Failed).await;
    assert_eq!(
        guard
            .consecutive_failures(46, "posting_jobs", "posting")
            .await
            .unwrap(),
        3
    );

    record(AuditStatus::Success).await;
    assert_eq!(
        guard
            .consecutive_failures(46, "posting_jobs", "posting")
            .await
            .unwrap(),
        0
    );
}
