use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored OAuth token, one row per account, overwritten on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XAuthToken {
    pub id: i64,
    pub account_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scope: String,
    pub token_type: String,
}

impl XAuthToken {
    /// A token is stale when it expires within the clock-skew margin.
    pub fn is_stale(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        self.expires_at <= now + margin
    }
}

/// Short-lived PKCE state, deleted on consumption or expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    pub id: i64,
    pub account_id: i64,
    pub state: String,
    pub code_verifier: String,
    pub expires_at: DateTime<Utc>,
}
