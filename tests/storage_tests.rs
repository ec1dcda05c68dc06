mod common;

use chrono::{Duration, TimeZone, Utc};
use common::{date, seed_agent, seed_due_post, setup_store};
use post_ops::domain::{
    AgentStatus, ExternalPost, ExternalPostMetrics, MetricsCollectionType, NewPost,
    PostOpsError, PostType,
};

#[tokio::test]
async fn test_claim_orders_by_schedule_then_id() {
    let store = setup_store().await;
    seed_agent(&store, 1, AgentStatus::Active).await;
    let now = Utc::now();

    let late = seed_due_post(&store, 1, "late", PostType::Tweet, now - Duration::minutes(1)).await;
    let early_a =
        seed_due_post(&store, 1, "early a", PostType::Tweet, now - Duration::minutes(9)).await;
    let early_b =
        seed_due_post(&store, 1, "early b", PostType::Tweet, now - Duration::minutes(9)).await;
    // Future posts are not due.
    seed_due_post(&store, 1, "future", PostType::Tweet, now + Duration::minutes(5)).await;

    let batch = store.claim_due_posts(now, 10).await.unwrap();
    let ids: Vec<i64> = batch.posts().iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![early_a, early_b, late]);
    batch.commit().await.unwrap();
}

#[tokio::test]
async fn test_mark_posted_is_at_most_once() {
    let store = setup_store().await;
    seed_agent(&store, 2, AgentStatus::Active).await;
    let now = Utc::now();
    let post_id = seed_due_post(&store, 2, "contended", PostType::Tweet, now).await;

    // Two workers observe the same due post.
    let mut first = store.claim_due_posts(now, 10).await.unwrap();
    let mut second = store.claim_due_posts(now, 10).await.unwrap();
    assert_eq!(first.posts().len(), 1);
    assert_eq!(second.posts().len(), 1);

    assert!(first.mark_posted(post_id, "ext-a", now).await.unwrap());
    // The compare-and-swap refuses the second write.
    assert!(!second.mark_posted(post_id, "ext-b", now).await.unwrap());

    first.commit().await.unwrap();
    second.commit().await.unwrap();

    let post = store.get_post(post_id).await.unwrap().unwrap();
    assert_eq!(post.external_id.as_deref(), Some("ext-a"));
}

#[tokio::test]
async fn test_batch_size_limits_claims() {
    let store = setup_store().await;
    seed_agent(&store, 3, AgentStatus::Active).await;
    let now = Utc::now();
    for idx in 0..5 {
        seed_due_post(
            &store,
            3,
            &format!("post {idx}"),
            PostType::Tweet,
            now - Duration::minutes(idx + 1),
        )
        .await;
    }

    let batch = store.claim_due_posts(now, 3).await.unwrap();
    assert_eq!(batch.posts().len(), 3);
    batch.commit().await.unwrap();
}

#[tokio::test]
async fn test_dedupe_unique_constraint_translates() {
    let store = setup_store().await;
    seed_agent(&store, 4, AgentStatus::Active).await;
    let bucket = date(2026, 1, 9);

    store
        .insert_post(&NewPost {
            agent_id: 4,
            content: "original".to_string(),
            post_type: PostType::Tweet,
            content_hash: Some("a".repeat(64)),
            content_bucket_date: Some(bucket),
            ..Default::default()
        })
        .await
        .unwrap();

    let duplicate = store
        .insert_post(&NewPost {
            agent_id: 4,
            content: "twin".to_string(),
            post_type: PostType::Tweet,
            content_hash: Some("a".repeat(64)),
            content_bucket_date: Some(bucket),
            ..Default::default()
        })
        .await;
    assert!(matches!(duplicate, Err(PostOpsError::DuplicateContent)));

    // A different bucket date is fine.
    assert!(store
        .insert_post(&NewPost {
            agent_id: 4,
            content: "tomorrow twin".to_string(),
            post_type: PostType::Tweet,
            content_hash: Some("a".repeat(64)),
            content_bucket_date: Some(date(2026, 1, 10)),
            ..Default::default()
        })
        .await
        .is_ok());
}

#[tokio::test]
async fn test_upsert_external_post_refreshes_fields() {
    let store = setup_store().await;
    seed_agent(&store, 5, AgentStatus::Active).await;
    let posted_at = Utc.with_ymd_and_hms(2026, 1, 8, 9, 0, 0).single().unwrap();

    let external = ExternalPost {
        external_id: "ext-100".to_string(),
        posted_at,
        text: "first text".to_string(),
        post_type: PostType::Tweet,
        media_urls: Vec::new(),
    };
    let created = store.upsert_external_post(5, &external).await.unwrap();

    let refreshed = ExternalPost {
        text: "edited text".to_string(),
        media_urls: vec!["https://example.com/new.png".to_string()],
        ..external
    };
    let updated = store.upsert_external_post(5, &refreshed).await.unwrap();

    assert_eq!(created.id, updated.id);
    assert_eq!(updated.content, "edited text");
    assert_eq!(updated.media_urls.len(), 1);
    assert_eq!(store.list_agent_posts(5).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_confirmed_metrics_unique_per_collection() {
    let store = setup_store().await;
    seed_agent(&store, 6, AgentStatus::Active).await;
    let now = Utc::now();
    let post_id = seed_due_post(&store, 6, "measured", PostType::Tweet, now).await;

    let metrics = ExternalPostMetrics {
        external_id: "ext".to_string(),
        impressions: 100,
        likes: 10,
        replies: 2,
        retweets: 3,
        clicks: 5,
        impressions_unavailable: false,
    };
    store
        .insert_post_metrics(post_id, MetricsCollectionType::Confirmed, now, &metrics)
        .await
        .unwrap();

    // Same (post, type, time) is refused by the store.
    assert!(store
        .insert_post_metrics(post_id, MetricsCollectionType::Confirmed, now, &metrics)
        .await
        .is_err());

    assert!(store
        .has_metrics(post_id, MetricsCollectionType::Confirmed)
        .await
        .unwrap());
    assert!(!store
        .has_metrics(post_id, MetricsCollectionType::Snapshot)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_target_candidates_dedupe_by_url() {
    let store = setup_store().await;
    seed_agent(&store, 7, AgentStatus::Active).await;
    let day = date(2026, 1, 8);
    let target = post_ops::domain::TargetPost {
        external_id: "x-1".to_string(),
        url: "https://x.com/watched/status/1".to_string(),
        author_handle: "watched".to_string(),
        text: "hello".to_string(),
        created_at: Utc::now(),
    };

    assert!(store.insert_target_candidate(7, day, &target).await.unwrap());
    assert!(!store.insert_target_candidate(7, day, &target).await.unwrap());
    assert_eq!(store.list_unused_targets(7, day).await.unwrap().len(), 1);

    store
        .mark_target_used(7, day, &target.url)
        .await
        .unwrap();
    assert!(store.list_unused_targets(7, day).await.unwrap().is_empty());
}
