use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::domain::PostOpsError;

/// Deterministic short-code API errors surfaced by the dashboard.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>) -> Self {
        Self::BadRequest(code.into())
    }

    pub fn not_found(code: impl Into<String>) -> Self {
        Self::NotFound(code.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            Self::BadRequest(code) => (StatusCode::BAD_REQUEST, code),
            Self::NotFound(code) => (StatusCode::NOT_FOUND, code),
            Self::BadGateway(code) => (StatusCode::BAD_GATEWAY, code),
            Self::Internal(code) => (StatusCode::INTERNAL_SERVER_ERROR, code),
        };
        (status, Json(serde_json::json!({"error": code}))).into_response()
    }
}

impl From<PostOpsError> for ApiError {
    fn from(err: PostOpsError) -> Self {
        match err {
            PostOpsError::OAuthStateInvalid => Self::BadRequest("oauth_state_invalid".to_string()),
            PostOpsError::TokenNotFound(_) => {
                Self::NotFound("x_auth_token_not_found".to_string())
            }
            PostOpsError::OAuth(code) => Self::BadGateway(code),
            PostOpsError::NotFound(what) => Self::NotFound(what.replace(' ', "_")),
            other => Self::Internal(other.kind().to_string()),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
