mod common;

use chrono::Utc;
use common::{date, seed_agent, setup_store};
use post_ops::config::{PlanConfig, WorkerConfig};
use post_ops::controls::BudgetLedger;
use post_ops::domain::{AgentStatus, PostType, TargetPost};
use post_ops::worker::{build_post_drafts, create_next_day_posts};
use rust_decimal::Decimal;

fn plan_cost() -> Decimal {
    Decimal::new(50, 2)
}

fn quarter_ratios() -> PlanConfig {
    PlanConfig {
        thread_ratio: 0.25,
        reply_ratio: 0.25,
        quote_ratio: 0.25,
        allow_url_for_validation: false,
    }
}

async fn seed_target(store: &post_ops::Store, agent_id: i64, date: chrono::NaiveDate, n: u32) {
    let target = TargetPost {
        external_id: format!("t-{n}"),
        url: format!("https://x.com/watched/status/90{n}"),
        author_handle: "watched".to_string(),
        text: format!("interesting post {n}"),
        created_at: Utc::now(),
    };
    assert!(store
        .insert_target_candidate(agent_id, date, &target)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_drafts_consume_targets_and_mark_them_used() {
    let store = setup_store().await;
    seed_agent(&store, 1, AgentStatus::Active).await;
    let target_date = date(2026, 1, 8);
    seed_target(&store, 1, target_date, 1).await;
    seed_target(&store, 1, target_date, 2).await;

    let mut ledger = BudgetLedger::new(store.clone(), 1, target_date, 300, 100, 200);
    let plan = build_post_drafts(
        &store,
        1,
        target_date,
        4,
        &mut ledger,
        &quarter_ratios(),
        plan_cost(),
    )
    .await
    .unwrap();
    assert!(plan.used_search_material);

    let reply = plan
        .drafts
        .iter()
        .find(|draft| draft.post_type == PostType::Reply)
        .expect("reply draft");
    assert!(reply.target_post_url.is_some());
    // URL embedding is off by default.
    assert!(!reply.text.contains("https://"));

    let created = create_next_day_posts(
        &store,
        1,
        target_date,
        4,
        &plan.drafts,
        &WorkerConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(created.len(), 4);

    let remaining = store.list_unused_targets(1, target_date).await.unwrap();
    // Reply and quote drafts consumed the two candidates.
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_repeated_planning_does_not_duplicate_posts() {
    let store = setup_store().await;
    seed_agent(&store, 2, AgentStatus::Active).await;
    let target_date = date(2026, 1, 8);

    for _ in 0..2 {
        let mut ledger = BudgetLedger::new(store.clone(), 2, target_date, 300, 100, 200);
        let plan = build_post_drafts(
            &store,
            2,
            target_date,
            2,
            &mut ledger,
            &quarter_ratios(),
            plan_cost(),
        )
        .await
        .unwrap();
        create_next_day_posts(
            &store,
            2,
            target_date,
            2,
            &plan.drafts,
            &WorkerConfig::default(),
        )
        .await
        .unwrap();
    }

    let posts = store.list_agent_posts(2).await.unwrap();
    assert_eq!(posts.len(), 2);
}

#[tokio::test]
async fn test_fallback_facts_without_research() {
    let store = setup_store().await;
    seed_agent(&store, 3, AgentStatus::Active).await;
    let target_date = date(2026, 1, 8);

    let mut ledger = BudgetLedger::new(store.clone(), 3, target_date, 300, 100, 200);
    let plan = build_post_drafts(
        &store,
        3,
        target_date,
        3,
        &mut ledger,
        &quarter_ratios(),
        plan_cost(),
    )
    .await
    .unwrap();

    assert!(!plan.used_search_material);
    assert_eq!(plan.drafts.len(), 3);
    assert!(plan
        .drafts
        .iter()
        .any(|draft| draft.text.contains("Agent 3 focus for 2026-01-08")));
}

#[tokio::test]
async fn test_url_embedding_switch() {
    let store = setup_store().await;
    seed_agent(&store, 4, AgentStatus::Active).await;
    let target_date = date(2026, 1, 8);
    seed_target(&store, 4, target_date, 7).await;

    let mut plan_config = quarter_ratios();
    plan_config.allow_url_for_validation = true;

    let mut ledger = BudgetLedger::new(store.clone(), 4, target_date, 300, 100, 200);
    let plan = build_post_drafts(
        &store,
        4,
        target_date,
        4,
        &mut ledger,
        &plan_config,
        plan_cost(),
    )
    .await
    .unwrap();

    let reply = plan
        .drafts
        .iter()
        .find(|draft| draft.post_type == PostType::Reply)
        .expect("reply draft");
    assert!(reply
        .text
        .ends_with(reply.target_post_url.as_deref().unwrap()));
}

#[tokio::test]
async fn test_plan_reserves_fixed_cost() {
    let store = setup_store().await;
    seed_agent(&store, 5, AgentStatus::Active).await;
    let target_date = date(2026, 1, 8);

    // Budget too small for the plan cost.
    let mut ledger = BudgetLedger::new(store.clone(), 5, target_date, 0, 0, 0);
    assert!(build_post_drafts(
        &store,
        5,
        target_date,
        1,
        &mut ledger,
        &quarter_ratios(),
        plan_cost(),
    )
    .await
    .is_err());

    // Zero posts per day skips the reservation entirely.
    let plan = build_post_drafts(
        &store,
        5,
        target_date,
        0,
        &mut ledger,
        &quarter_ratios(),
        plan_cost(),
    )
    .await
    .unwrap();
    assert!(plan.drafts.is_empty());
}
