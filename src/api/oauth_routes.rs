//! PKCE authorization endpoints: start, callback, refresh and status.

use axum::extract::{Query, State};
use axum::http::{header::LOCATION, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::domain::{OAuthState, XAuthToken};
use crate::oauth::{generate_pkce_pair, generate_state, state_ttl};

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub account_id: i64,
}

/// `GET /oauth/x/start?account_id=…` → 302 to the provider with PKCE params.
pub async fn start(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Response> {
    state
        .store
        .get_account(query.account_id)
        .await?
        .ok_or_else(|| ApiError::not_found("account_not_found"))?;

    let oauth_state = generate_state();
    let (verifier, challenge) = generate_pkce_pair();
    state
        .store
        .insert_oauth_state(&OAuthState {
            id: 0,
            account_id: query.account_id,
            state: oauth_state.clone(),
            code_verifier: verifier,
            expires_at: Utc::now() + state_ttl(),
        })
        .await?;

    let authorize_url = state
        .oauth_client
        .build_authorize_url(&oauth_state, &challenge)?;
    Ok(found(authorize_url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub state: String,
    pub code: String,
}

/// `GET /oauth/x/callback?state=…&code=…` — consumes the state row, swaps the
/// code for tokens and lands back on the account's auth page.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Response> {
    let now = Utc::now();
    let pending = state
        .store
        .take_oauth_state(&query.state, now)
        .await?
        .ok_or_else(|| ApiError::bad_request("oauth_state_invalid"))?;

    let token = state
        .oauth_client
        .exchange_code(&query.code, &pending.code_verifier)
        .await?;

    state
        .store
        .upsert_token(&XAuthToken {
            id: 0,
            account_id: pending.account_id,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: now + Duration::seconds(token.expires_in),
            scope: token.scope.unwrap_or_default(),
            token_type: token.token_type.unwrap_or_else(|| "bearer".to_string()),
        })
        .await?;

    Ok(found(format!(
        "/accounts/{}/auth/x?connected=1",
        pending.account_id
    )))
}

/// `POST /oauth/x/refresh?account_id=…`
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Json<Value>> {
    let stored = state
        .store
        .get_token_for_account(query.account_id)
        .await?
        .ok_or_else(|| ApiError::not_found("x_auth_token_not_found"))?;

    let now = Utc::now();
    let refreshed = state.oauth_client.refresh(&stored.refresh_token).await?;
    state
        .store
        .upsert_token(&XAuthToken {
            id: stored.id,
            account_id: stored.account_id,
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
            expires_at: now + Duration::seconds(refreshed.expires_in),
            scope: refreshed.scope.unwrap_or(stored.scope),
            token_type: refreshed.token_type.unwrap_or(stored.token_type),
        })
        .await?;

    Ok(Json(serde_json::json!({"status": "refreshed"})))
}

/// `GET /oauth/x/status?account_id=…`
pub async fn status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Json<Value>> {
    match state.store.get_token_for_account(query.account_id).await? {
        Some(token) => Ok(Json(serde_json::json!({
            "connected": true,
            "expires_at": token.expires_at,
            "scope": token.scope,
            "token_type": token.token_type,
        }))),
        None => Ok(Json(serde_json::json!({"connected": false}))),
    }
}
