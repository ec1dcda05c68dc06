mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, Utc};
use common::{seed_agent, setup_store, test_config};
use post_ops::api::{create_router, AppState};
use post_ops::config::OAuthConfig;
use post_ops::domain::{AgentStatus, OAuthState, XAuthToken};
use post_ops::oauth::OAuthClient;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oauth_config(token_url: Option<String>) -> OAuthConfig {
    OAuthConfig {
        client_id: Some("cid".to_string()),
        client_secret: None,
        redirect_uri: Some("https://app.example/oauth/x/callback".to_string()),
        token_url: token_url.unwrap_or_else(|| "http://127.0.0.1:1/token".to_string()),
        ..Default::default()
    }
}

async fn app(store: post_ops::Store, token_url: Option<String>) -> axum::Router {
    let log_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&log_dir);
    config.oauth = oauth_config(token_url);
    let oauth_client = OAuthClient::new(config.oauth.clone());
    create_router(Arc::new(AppState {
        store,
        config,
        oauth_client,
    }))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn patch_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app(setup_store().await, None).await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_agents_overview_and_detail() {
    let store = setup_store().await;
    seed_agent(&store, 1, AgentStatus::Active).await;
    seed_agent(&store, 2, AgentStatus::Paused).await;
    let app = app(store, None).await;

    let response = app.clone().oneshot(get("/api/agents")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["agents"].as_array().unwrap().len(), 2);
    assert_eq!(body["app_wide_usage"]["x_usage_units"], 0);

    let response = app.clone().oneshot(get("/api/agents/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["agent"]["id"], 1);
    assert_eq!(body["agent"]["status"], "active");

    let response = app.oneshot(get("/api/agents/99")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "agent_not_found");
}

#[tokio::test]
async fn test_patch_agent_validation_and_diff_audit() {
    let store = setup_store().await;
    seed_agent(&store, 5, AgentStatus::Active).await;
    let app = app(store.clone(), None).await;

    let response = app
        .clone()
        .oneshot(patch_json("/api/agents/5", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "empty_patch");

    let response = app
        .clone()
        .oneshot(patch_json(
            "/api/agents/5",
            serde_json::json!({"daily_budget": -1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "daily_budget_invalid");

    let response = app
        .clone()
        .oneshot(patch_json(
            "/api/agents/5",
            serde_json::json!({"feature_toggles": {"unknown_key": 1}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "feature_toggle_invalid");

    let response = app
        .clone()
        .oneshot(patch_json(
            "/api/agents/5",
            serde_json::json!({
                "daily_budget": 500,
                "feature_toggles": {"posts_per_day": 4},
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let agent = store.get_agent(5).await.unwrap().unwrap();
    assert_eq!(agent.daily_budget, 500);
    assert_eq!(
        agent.feature_toggles.get("posts_per_day"),
        Some(&serde_json::json!(4))
    );

    let audits = store.list_audits(5, 10).await.unwrap();
    assert!(audits
        .iter()
        .any(|audit| audit.event_type == "agent_patch"));
}

#[tokio::test]
async fn test_stop_and_resume() {
    let store = setup_store().await;
    seed_agent(&store, 6, AgentStatus::Active).await;
    let app = app(store.clone(), None).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/agents/6/stop", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "reason_required");

    let until = Utc::now() + Duration::hours(6);
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/agents/6/stop",
            serde_json::json!({"reason": "manual hold", "until": until}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let agent = store.get_agent(6).await.unwrap().unwrap();
    assert_eq!(agent.status, AgentStatus::Stopped);
    assert_eq!(agent.stop_reason.as_deref(), Some("manual hold"));
    assert!(agent.stopped_at.is_some());
    assert!(agent.stop_until.is_some());

    let response = app
        .oneshot(post_json("/api/agents/6/resume", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let agent = store.get_agent(6).await.unwrap().unwrap();
    assert_eq!(agent.status, AgentStatus::Active);
    assert!(agent.stop_reason.is_none());
    assert!(agent.stop_until.is_none());
}

#[tokio::test]
async fn test_audit_listing_clamps_limit() {
    let store = setup_store().await;
    seed_agent(&store, 7, AgentStatus::Active).await;
    for idx in 0..5 {
        store
            .insert_audit(
                7,
                Utc::now().date_naive(),
                "api",
                "test_event",
                post_ops::domain::AuditStatus::Success,
                None,
                &serde_json::json!({"idx": idx}),
                Utc::now(),
            )
            .await
            .unwrap();
    }
    let app = app(store, None).await;

    let response = app
        .clone()
        .oneshot(get("/api/agents/7/audit?limit=2"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["audits"].as_array().unwrap().len(), 2);

    // limit=0 clamps to 1
    let response = app
        .oneshot(get("/api/agents/7/audit?limit=0"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["audits"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_config_defaults_block() {
    let app = app(setup_store().await, None).await;
    let response = app.oneshot(get("/api/config/defaults")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["worker"]["posting_batch_size"], 10);
    assert_eq!(body["search"]["web_fetch_max"], 3);
}

#[tokio::test]
async fn test_oauth_start_redirects_with_pkce() {
    let store = setup_store().await;
    let agent = seed_agent(&store, 8, AgentStatus::Active).await;
    let app = app(store.clone(), None).await;

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/oauth/x/start?account_id={}",
            agent.account_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with("https://x.com/i/oauth2/authorize?"));
    assert!(location.contains("code_challenge_method=S256"));
    assert!(location.contains("client_id=cid"));

    let response = app
        .oneshot(get("/oauth/x/start?account_id=404"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "account_not_found");
}

#[tokio::test]
async fn test_oauth_callback_exchanges_and_stores_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "acc-9",
            "refresh_token": "ref-9",
            "expires_in": 7200,
            "scope": "tweet.write",
            "token_type": "bearer",
        })))
        .mount(&server)
        .await;

    let store = setup_store().await;
    let agent = seed_agent(&store, 9, AgentStatus::Active).await;
    store
        .insert_oauth_state(&OAuthState {
            id: 0,
            account_id: agent.account_id,
            state: "state-9".to_string(),
            code_verifier: "verifier-9".to_string(),
            expires_at: Utc::now() + Duration::minutes(10),
        })
        .await
        .unwrap();

    let app = app(store.clone(), Some(format!("{}/token", server.uri()))).await;
    let response = app
        .clone()
        .oneshot(get("/oauth/x/callback?state=state-9&code=code-9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(
        location,
        format!("/accounts/{}/auth/x?connected=1", agent.account_id)
    );

    let token = store
        .get_token_for_account(agent.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(token.access_token, "acc-9");

    // Unknown state is rejected.
    let response = app
        .oneshot(get("/oauth/x/callback?state=state-9&code=code-9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "oauth_state_invalid");
}

#[tokio::test]
async fn test_oauth_status_and_refresh() {
    let store = setup_store().await;
    let agent = seed_agent(&store, 10, AgentStatus::Active).await;
    let app_no_token = app(store.clone(), None).await;

    let response = app_no_token
        .clone()
        .oneshot(get(&format!(
            "/oauth/x/status?account_id={}",
            agent.account_id
        )))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["connected"], false);

    let response = app_no_token
        .oneshot(post_json(
            &format!("/oauth/x/refresh?account_id={}", agent.account_id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "x_auth_token_not_found");

    store
        .upsert_token(&XAuthToken {
            id: 0,
            account_id: agent.account_id,
            access_token: "acc".to_string(),
            refresh_token: "ref".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            scope: "tweet.write".to_string(),
            token_type: "bearer".to_string(),
        })
        .await
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "acc-new",
            "refresh_token": "ref-new",
            "expires_in": 7200,
        })))
        .mount(&server)
        .await;
    let app_with_token = app(store.clone(), Some(format!("{}/token", server.uri()))).await;

    let response = app_with_token
        .clone()
        .oneshot(get(&format!(
            "/oauth/x/status?account_id={}",
            agent.account_id
        )))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["connected"], true);
    assert_eq!(body["scope"], "tweet.write");

    let response = app_with_token
        .oneshot(post_json(
            &format!("/oauth/x/refresh?account_id={}", agent.account_id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "refreshed");

    let token = store
        .get_token_for_account(agent.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(token.access_token, "acc-new");
}
