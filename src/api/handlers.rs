//! Dashboard handlers: agent overview, detail, patch, stop/resume, audit
//! trail and static defaults.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::controls::validate_toggle_patch;
use crate::domain::{Agent, AuditStatus, CostLog, APP_AGENT_ID};

pub async fn health() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

fn agent_summary(agent: &Agent, cost: Option<&CostLog>) -> Value {
    serde_json::json!({
        "id": agent.id,
        "account_id": agent.account_id,
        "status": agent.status.as_str(),
        "daily_budget": agent.daily_budget,
        "budget_split_x": agent.budget_split_x,
        "budget_split_llm": agent.budget_split_llm,
        "stop_reason": agent.stop_reason,
        "stop_until": agent.stop_until,
        "today_cost": cost.map(|log| serde_json::json!({
            "x_api_cost": log.x_api_cost,
            "llm_cost": log.llm_cost,
            "total": log.total,
        })),
    })
}

pub async fn list_agents(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let date = Utc::now().date_naive();
    let app_wide = state.store.get_cost_log(APP_AGENT_ID, date).await?;

    let mut agents = Vec::new();
    for agent in state.store.list_agents().await? {
        let cost = state.store.get_cost_log(agent.id, date).await?;
        agents.push(agent_summary(&agent, cost.as_ref()));
    }

    Ok(Json(serde_json::json!({
        "date": date,
        "app_wide_usage": {
            "x_usage_units": app_wide.as_ref().map(|log| log.x_usage_units).unwrap_or(0),
            "x_api_cost_actual": app_wide.as_ref().and_then(|log| log.x_api_cost_actual),
        },
        "agents": agents,
    })))
}

pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let agent = state
        .store
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| ApiError::not_found("agent_not_found"))?;
    let date = Utc::now().date_naive();
    let cost = state.store.get_cost_log(agent_id, date).await?;
    let pdca = state.store.list_recent_pdca(agent_id, 7).await?;

    Ok(Json(serde_json::json!({
        "agent": agent_summary(&agent, cost.as_ref()),
        "feature_toggles": Value::Object(agent.feature_toggles.clone()),
        "recent_pdca": pdca,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AgentPatch {
    pub daily_budget: Option<i64>,
    pub feature_toggles: Option<serde_json::Map<String, Value>>,
}

pub async fn patch_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<i64>,
    Json(patch): Json<AgentPatch>,
) -> ApiResult<Json<Value>> {
    if patch.daily_budget.is_none() && patch.feature_toggles.is_none() {
        return Err(ApiError::bad_request("empty_patch"));
    }

    let agent = state
        .store
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| ApiError::not_found("agent_not_found"))?;

    let mut diff = serde_json::Map::new();

    if let Some(daily_budget) = patch.daily_budget {
        if daily_budget < 0 {
            return Err(ApiError::bad_request("daily_budget_invalid"));
        }
        state.store.update_agent_budget(agent_id, daily_budget).await?;
        diff.insert(
            "daily_budget".to_string(),
            serde_json::json!({"from": agent.daily_budget, "to": daily_budget}),
        );
    }

    if let Some(toggles) = &patch.feature_toggles {
        if validate_toggle_patch(toggles).is_err() {
            return Err(ApiError::bad_request("feature_toggle_invalid"));
        }
        let mut merged = agent.feature_toggles.clone();
        for (key, value) in toggles {
            merged.insert(key.clone(), value.clone());
        }
        state
            .store
            .update_agent_toggles(agent_id, &Value::Object(merged))
            .await?;
        diff.insert(
            "feature_toggles".to_string(),
            Value::Object(toggles.clone()),
        );
    }

    state
        .store
        .insert_audit(
            agent_id,
            Utc::now().date_naive(),
            "api",
            "agent_patch",
            AuditStatus::Success,
            None,
            &Value::Object(diff),
            Utc::now(),
        )
        .await?;

    let updated = state
        .store
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| ApiError::not_found("agent_not_found"))?;
    Ok(Json(serde_json::json!({"agent": agent_summary(&updated, None)})))
}

#[derive(Debug, Deserialize)]
pub struct StopBody {
    pub reason: Option<String>,
    pub until: Option<DateTime<Utc>>,
}

pub async fn stop_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<i64>,
    Json(body): Json<StopBody>,
) -> ApiResult<Json<Value>> {
    let reason = body
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .ok_or_else(|| ApiError::bad_request("reason_required"))?;

    state
        .store
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| ApiError::not_found("agent_not_found"))?;

    let now = Utc::now();
    state
        .store
        .stop_agent(agent_id, reason, now, body.until)
        .await?;
    state
        .store
        .insert_audit(
            agent_id,
            now.date_naive(),
            "api",
            "agent_stop",
            AuditStatus::Success,
            Some(reason),
            &serde_json::json!({"until": body.until}),
            now,
        )
        .await?;

    Ok(Json(serde_json::json!({"status": "stopped"})))
}

pub async fn resume_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state
        .store
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| ApiError::not_found("agent_not_found"))?;

    let now = Utc::now();
    state.store.resume_agent(agent_id).await?;
    state
        .store
        .insert_audit(
            agent_id,
            now.date_naive(),
            "api",
            "agent_resume",
            AuditStatus::Success,
            None,
            &Value::Object(Default::default()),
            now,
        )
        .await?;

    Ok(Json(serde_json::json!({"status": "active"})))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

pub async fn list_audits(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<i64>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Value>> {
    state
        .store
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| ApiError::not_found("agent_not_found"))?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let audits = state.store.list_audits(agent_id, limit).await?;
    Ok(Json(serde_json::json!({"audits": audits})))
}

pub async fn config_defaults(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "costs": state.config.costs,
        "search": state.config.search,
        "plan": state.config.plan,
        "worker": {
            "posting_batch_size": state.config.worker.posting_batch_size,
            "posting_poll_seconds": state.config.worker.posting_poll_seconds,
            "post_hour": state.config.worker.post_hour,
            "post_minute": state.config.worker.post_minute,
            "timezone": state.config.worker.timezone.to_string(),
        },
    }))
}
