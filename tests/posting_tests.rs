mod common;

use chrono::{Duration, Utc};
use common::{seed_agent, seed_due_post, setup_store, test_config};
use post_ops::adapters::FakePoster;
use post_ops::domain::{ActionType, AgentStatus, NewPost, PostType};
use post_ops::worker::PostingWorker;
use std::sync::Arc;

#[tokio::test]
async fn test_due_post_is_published_exactly_once() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let config = test_config(&log_dir);
    seed_agent(&store, 1, AgentStatus::Active).await;
    let now = Utc::now();
    let post_id = seed_due_post(
        &store,
        1,
        "ship the weekly changelog",
        PostType::Tweet,
        now - Duration::minutes(10),
    )
    .await;

    let poster = Arc::new(FakePoster::new());
    let worker = PostingWorker::new(store.clone(), config).with_poster(poster.clone());

    let first = worker.run(now).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].post_id, post_id);
    assert_eq!(first[0].status, "posted");
    let external_id = first[0].external_id.clone().unwrap();
    assert!(external_id.starts_with("fake-tweet-1-"));

    // Second pass sees no due posts and touches nothing.
    let second = worker.run(now).await.unwrap();
    assert!(second.is_empty());
    assert_eq!(poster.call_count(), 1);

    let post = store.get_post(post_id).await.unwrap().unwrap();
    assert_eq!(post.external_id.as_deref(), Some(external_id.as_str()));
    assert!(post.posted_at.is_some());

    // Publication reserves and commits x cost.
    let cost = store
        .get_cost_log(1, now.date_naive())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cost.x_api_cost, rust_decimal::Decimal::new(100, 2));
}

#[tokio::test]
async fn test_invalid_reply_target_url_is_skipped_without_budget() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let config = test_config(&log_dir);
    seed_agent(&store, 2, AgentStatus::Active).await;
    let now = Utc::now();
    let post_id = store
        .insert_post(&NewPost {
            agent_id: 2,
            content: "reply body".to_string(),
            post_type: PostType::Reply,
            scheduled_at: Some(now - Duration::minutes(1)),
            target_post_url: Some("https://example.com/not-a-status-url".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let poster = Arc::new(FakePoster::new());
    let worker = PostingWorker::new(store.clone(), config).with_poster(poster.clone());
    let results = worker.run(now).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, "skipped");
    assert_eq!(results[0].reason.as_deref(), Some("invalid_target_url"));
    assert_eq!(poster.call_count(), 0);

    let post = store.get_post(post_id).await.unwrap().unwrap();
    assert!(post.posted_at.is_none());
    assert!(store
        .get_cost_log(2, now.date_naive())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_content_cannot_post_twice() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let config = test_config(&log_dir);
    seed_agent(&store, 3, AgentStatus::Active).await;
    let now = Utc::now();

    // Identical content module case and whitespace.
    seed_due_post(
        &store,
        3,
        "Same   Content",
        PostType::Tweet,
        now - Duration::minutes(2),
    )
    .await;
    seed_due_post(
        &store,
        3,
        "same content",
        PostType::Tweet,
        now - Duration::minutes(1),
    )
    .await;

    let poster = Arc::new(FakePoster::new());
    let worker = PostingWorker::new(store.clone(), config).with_poster(poster.clone());
    let results = worker.run(now).await.unwrap();

    let posted: Vec<_> = results.iter().filter(|r| r.status == "posted").collect();
    let skipped: Vec<_> = results
        .iter()
        .filter(|r| r.reason.as_deref() == Some("duplicate_content"))
        .collect();
    assert_eq!(posted.len(), 1);
    assert_eq!(skipped.len(), 1);
    assert_eq!(poster.call_count(), 1);
}

#[tokio::test]
async fn test_engagement_rate_limit_counts_committed_actions() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let config = test_config(&log_dir);
    seed_agent(&store, 4, AgentStatus::Active).await;
    let now = Utc::now();

    for _ in 0..3 {
        store
            .insert_engagement(
                4,
                0,
                ActionType::Reply,
                "https://x.com/u/status/1",
                None,
                now,
            )
            .await
            .unwrap();
    }
    seed_due_post(&store, 4, "tweets still pass", PostType::Tweet, now).await;
    store
        .insert_post(&NewPost {
            agent_id: 4,
            content: "one more reply".to_string(),
            post_type: PostType::Reply,
            scheduled_at: Some(now - Duration::minutes(1)),
            target_post_url: Some("https://x.com/u/status/99".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let poster = Arc::new(FakePoster::new());
    let worker = PostingWorker::new(store.clone(), config).with_poster(poster.clone());
    let results = worker.run(now).await.unwrap();

    let tweet = results
        .iter()
        .find(|r| r.status == "posted")
        .expect("plain tweet published");
    assert!(tweet.external_id.is_some());
    let reply = results
        .iter()
        .find(|r| r.reason.as_deref() == Some("rate_limited"))
        .expect("reply rate limited");
    assert_eq!(reply.status, "skipped");
}

#[tokio::test]
async fn test_in_loop_attempts_count_against_the_cap() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let config = test_config(&log_dir);
    let agent = seed_agent(&store, 5, AgentStatus::Active).await;
    store
        .update_agent_toggles(
            agent.id,
            &serde_json::json!({"reply_quote_daily_max": 1}),
        )
        .await
        .unwrap();
    let now = Utc::now();

    for idx in 0..2 {
        store
            .insert_post(&NewPost {
                agent_id: 5,
                content: format!("reply number {idx}"),
                post_type: PostType::Reply,
                scheduled_at: Some(now - Duration::minutes(2 - idx)),
                target_post_url: Some(format!("https://x.com/u/status/10{idx}")),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    let poster = Arc::new(FakePoster::new());
    let worker = PostingWorker::new(store.clone(), config).with_poster(poster.clone());
    let results = worker.run(now).await.unwrap();

    assert_eq!(poster.call_count(), 1);
    assert_eq!(
        results.iter().filter(|r| r.status == "posted").count(),
        1
    );
    assert_eq!(
        results
            .iter()
            .filter(|r| r.reason.as_deref() == Some("rate_limited"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_budget_exhausted_publish_fails_with_audit() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let config = test_config(&log_dir);
    let agent = seed_agent(&store, 6, AgentStatus::Active).await;
    store
        .update_agent_budget_splits(agent.id, 0, 0, 0)
        .await
        .unwrap();
    let now = Utc::now();
    seed_due_post(&store, 6, "over budget", PostType::Tweet, now).await;

    let poster = Arc::new(FakePoster::new());
    let worker = PostingWorker::new(store.clone(), config).with_poster(poster.clone());
    let results = worker.run(now).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, "failed");
    assert_eq!(
        results[0].error.as_ref().map(|e| e.kind.as_str()),
        Some("budget_exceeded")
    );
    assert_eq!(poster.call_count(), 0);

    let audits = store.list_audits(6, 10).await.unwrap();
    assert!(audits
        .iter()
        .any(|audit| audit.reason.as_deref() == Some("budget_exceeded")));
}

#[tokio::test]
async fn test_thread_posts_publish_with_parts() {
    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let config = test_config(&log_dir);
    seed_agent(&store, 7, AgentStatus::Active).await;
    let now = Utc::now();
    let post_id = store
        .insert_post(&NewPost {
            agent_id: 7,
            content: "part one".to_string(),
            post_type: PostType::Thread,
            thread_parts: Some(vec!["part one".to_string(), "part two".to_string()]),
            scheduled_at: Some(now - Duration::minutes(1)),
            ..Default::default()
        })
        .await
        .unwrap();

    let poster = Arc::new(FakePoster::new());
    let worker = PostingWorker::new(store.clone(), config).with_poster(poster.clone());
    let results = worker.run(now).await.unwrap();

    assert_eq!(results[0].post_id, post_id);
    assert_eq!(results[0].status, "posted");
    assert!(results[0]
        .external_id
        .as_deref()
        .unwrap()
        .starts_with("fake-thread-7-"));
}
