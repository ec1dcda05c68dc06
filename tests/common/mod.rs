//! Shared helpers for the integration suites.
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use post_ops::adapters::{
    FakePlatformClient, FakeTargetPostSource, FakeWebSearchClient, FakeXSearchClient,
    WebFetchClient,
};
use post_ops::config::Config;
use post_ops::domain::{Agent, AgentStatus, NewPost, PostType};
use post_ops::storage::Store;
use post_ops::worker::DailyRoutine;

/// Fresh in-memory store with migrations applied.
pub async fn setup_store() -> Store {
    Store::in_memory().await.expect("in-memory store")
}

/// Hermetic config: temp run-log directory, UTC worker timezone.
pub fn test_config(log_dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.worker.log_dir = log_dir.path().to_path_buf();
    config
}

/// Seed a business account plus an agent with the given id and status.
pub async fn seed_agent(store: &Store, agent_id: i64, status: AgentStatus) -> Agent {
    let account_id = store
        .insert_account(
            &format!("acct-{agent_id}"),
            post_ops::domain::AccountType::Business,
            &serde_json::json!({"x": "fake"}),
            "/tmp",
        )
        .await
        .expect("seed account");
    store
        .insert_agent_with_id(agent_id, account_id, status)
        .await
        .expect("seed agent");
    store
        .get_agent(agent_id)
        .await
        .expect("get agent")
        .expect("agent exists")
}

/// Seed a due post scheduled in the past.
pub async fn seed_due_post(
    store: &Store,
    agent_id: i64,
    content: &str,
    post_type: PostType,
    scheduled_at: DateTime<Utc>,
) -> i64 {
    store
        .insert_post(&NewPost {
            agent_id,
            content: content.to_string(),
            post_type,
            scheduled_at: Some(scheduled_at),
            ..Default::default()
        })
        .await
        .expect("seed post")
}

/// Daily routine wired to the deterministic fakes.
pub fn fake_routine(store: Store, config: Config) -> DailyRoutine {
    DailyRoutine::new(
        store,
        config,
        Arc::new(FakePlatformClient),
        Arc::new(FakeWebSearchClient),
        Arc::new(FakeXSearchClient),
        Arc::new(FakeTargetPostSource),
        Arc::new(WebFetchClient::default()),
        None,
        None,
    )
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
