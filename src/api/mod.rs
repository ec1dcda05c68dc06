//! Dashboard and OAuth HTTP surface.

mod error;
mod handlers;
mod oauth_routes;

use axum::routing::{get, patch, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::domain::Result;
use crate::oauth::OAuthClient;
use crate::storage::Store;

pub use error::{ApiError, ApiResult};

/// Shared handler state.
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub oauth_client: OAuthClient,
}

/// Build the full router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/agents", get(handlers::list_agents))
        .route("/api/agents/:id", get(handlers::get_agent))
        .route("/api/agents/:id", patch(handlers::patch_agent))
        .route("/api/agents/:id/stop", post(handlers::stop_agent))
        .route("/api/agents/:id/resume", post(handlers::resume_agent))
        .route("/api/agents/:id/audit", get(handlers::list_audits))
        .route("/api/config/defaults", get(handlers::config_defaults))
        .route("/oauth/x/start", get(oauth_routes::start))
        .route("/oauth/x/callback", get(oauth_routes::callback))
        .route("/oauth/x/refresh", post(oauth_routes::refresh))
        .route("/oauth/x/status", get(oauth_routes::status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until the process is terminated.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", state.config.api.bind, state.config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "api listening");
    axum::serve(listener, create_router(state))
        .await
        .map_err(Into::into)
}
