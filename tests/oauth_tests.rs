mod common;

use chrono::{Duration, Utc};
use common::{seed_agent, seed_due_post, setup_store, test_config};
use post_ops::config::OAuthConfig;
use post_ops::domain::{AgentStatus, AuditStatus, OAuthState, PostType, XAuthToken};
use post_ops::oauth::{
    challenge_from_verifier, generate_pkce_pair, generate_state, OAuthClient, TokenProvider,
};
use post_ops::worker::PostingWorker;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oauth_config(token_url: String) -> OAuthConfig {
    OAuthConfig {
        client_id: Some("cid".to_string()),
        client_secret: None,
        redirect_uri: Some("https://app.example/oauth/x/callback".to_string()),
        token_url,
        ..Default::default()
    }
}

#[test]
fn test_pkce_round_trip() {
    let (verifier, challenge) = generate_pkce_pair();
    assert_eq!(challenge_from_verifier(&verifier), challenge);
}

#[tokio::test]
async fn test_oauth_state_single_use_and_expiry() {
    let store = setup_store().await;
    let agent = seed_agent(&store, 1, AgentStatus::Active).await;
    let now = Utc::now();

    let live = generate_state();
    store
        .insert_oauth_state(&OAuthState {
            id: 0,
            account_id: agent.account_id,
            state: live.clone(),
            code_verifier: "verifier".to_string(),
            expires_at: now + Duration::minutes(10),
        })
        .await
        .unwrap();

    let taken = store.take_oauth_state(&live, now).await.unwrap();
    assert!(taken.is_some());
    // Consumed: a second take sees nothing.
    assert!(store.take_oauth_state(&live, now).await.unwrap().is_none());

    let expired = generate_state();
    store
        .insert_oauth_state(&OAuthState {
            id: 0,
            account_id: agent.account_id,
            state: expired.clone(),
            code_verifier: "verifier".to_string(),
            expires_at: now - Duration::minutes(1),
        })
        .await
        .unwrap();
    assert!(store
        .take_oauth_state(&expired, now)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_token_exchange_posts_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code_verifier=verifier-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "acc-1",
            "refresh_token": "ref-1",
            "expires_in": 7200,
            "scope": "tweet.write tweet.read",
            "token_type": "bearer",
        })))
        .mount(&server)
        .await;

    let client = OAuthClient::new(oauth_config(format!("{}/token", server.uri())));
    let token = client.exchange_code("code-1", "verifier-1").await.unwrap();
    assert_eq!(token.access_token, "acc-1");
    assert_eq!(token.refresh_token, "ref-1");
    assert_eq!(token.expires_in, 7200);
}

#[tokio::test]
async fn test_token_request_failure_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = OAuthClient::new(oauth_config(format!("{}/token", server.uri())));
    let err = client.refresh("ref").await.unwrap_err();
    assert!(err.to_string().contains("x_oauth_token_request_failed:503"));
}

#[tokio::test]
async fn test_provider_returns_fresh_token_without_refresh() {
    let store = setup_store().await;
    let agent = seed_agent(&store, 2, AgentStatus::Active).await;
    let now = Utc::now();
    store
        .upsert_token(&XAuthToken {
            id: 0,
            account_id: agent.account_id,
            access_token: "fresh".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: now + Duration::hours(2),
            scope: "tweet.write".to_string(),
            token_type: "bearer".to_string(),
        })
        .await
        .unwrap();

    // Unroutable token URL: any refresh attempt would fail loudly.
    let provider = TokenProvider::new(
        store.clone(),
        OAuthClient::new(oauth_config("http://127.0.0.1:1/token".to_string())),
    );
    let token = provider
        .token_for_account(agent.account_id, now)
        .await
        .unwrap();
    assert_eq!(token, "fresh");
}

#[tokio::test]
async fn test_provider_refreshes_stale_token_and_persists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "rotated",
            "refresh_token": "rotated-refresh",
            "expires_in": 7200,
        })))
        .mount(&server)
        .await;

    let store = setup_store().await;
    let agent = seed_agent(&store, 3, AgentStatus::Active).await;
    let now = Utc::now();
    store
        .upsert_token(&XAuthToken {
            id: 0,
            account_id: agent.account_id,
            access_token: "old".to_string(),
            refresh_token: "old-refresh".to_string(),
            // Inside the two-minute staleness margin.
            expires_at: now + Duration::seconds(60),
            scope: "tweet.write".to_string(),
            token_type: "bearer".to_string(),
        })
        .await
        .unwrap();

    let provider = TokenProvider::new(
        store.clone(),
        OAuthClient::new(oauth_config(format!("{}/token", server.uri()))),
    );
    let token = provider
        .token_for_account(agent.account_id, now)
        .await
        .unwrap();
    assert_eq!(token, "rotated");

    let stored = store
        .get_token_for_account(agent.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.access_token, "rotated");
    assert_eq!(stored.refresh_token, "rotated-refresh");
    // The previous scope survives a response without one.
    assert_eq!(stored.scope, "tweet.write");
}

#[tokio::test]
async fn test_refresh_failures_cascade_into_auto_stop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = setup_store().await;
    let log_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&log_dir);
    config.toggles.use_real_x = true;
    config.oauth = oauth_config(format!("{}/token", server.uri()));

    let agent = seed_agent(&store, 88, AgentStatus::Active).await;
    let now = Utc::now();
    store
        .upsert_token(&XAuthToken {
            id: 0,
            account_id: agent.account_id,
            access_token: "old".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: now - Duration::minutes(1),
            scope: "tweet.read tweet.write".to_string(),
            token_type: "bearer".to_string(),
        })
        .await
        .unwrap();
    for idx in 0..3 {
        seed_due_post(
            &store,
            88,
            &format!("pending {idx}"),
            PostType::Tweet,
            now - Duration::minutes(3 - idx),
        )
        .await;
    }

    let provider = TokenProvider::new(
        store.clone(),
        OAuthClient::new(config.oauth.clone()),
    );
    let worker = PostingWorker::new(store.clone(), config).with_token_provider(provider);
    let results = worker.run(now).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results
        .iter()
        .all(|entry| entry.reason.as_deref() == Some("x_auth_refresh_failed")));

    let audits = store.list_audits(88, 50).await.unwrap();
    let refresh_failures = audits
        .iter()
        .filter(|audit| {
            audit.source == "oauth"
                && audit.event_type == "refresh"
                && audit.status == AuditStatus::Failed
        })
        .count();
    assert_eq!(refresh_failures, 3);
    assert!(audits.iter().any(|audit| {
        audit.event_type == "auto_stop" && audit.status == AuditStatus::Triggered
    }));

    let stopped = store.get_agent(88).await.unwrap().unwrap();
    assert_eq!(stopped.status, AgentStatus::Stopped);
    assert_eq!(
        stopped.stop_reason.as_deref(),
        Some("auto_anomaly_oauth_refresh_failures")
    );
}
