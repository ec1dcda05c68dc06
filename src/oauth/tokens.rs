//! Stored-token lifecycle: staleness check, refresh-on-demand, persistence.

use chrono::{DateTime, Duration, Utc};

use super::client::OAuthClient;
use crate::domain::{PostOpsError, Result, XAuthToken};
use crate::storage::Store;

/// Clock-skew margin: a token expiring within this window is refreshed
/// before use.
pub fn staleness_margin() -> Duration {
    Duration::seconds(120)
}

/// Hands out fresh access tokens for accounts, refreshing stale ones
/// through the token endpoint and overwriting the stored row.
pub struct TokenProvider {
    store: Store,
    client: OAuthClient,
}

impl TokenProvider {
    pub fn new(store: Store, client: OAuthClient) -> Self {
        Self { store, client }
    }

    /// Access token for the account, refreshed when stale. All failure modes
    /// surface as [`PostOpsError::OAuthRefresh`] so the posting worker can
    /// audit them uniformly.
    pub async fn token_for_account(
        &self,
        account_id: i64,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let token = self
            .store
            .get_token_for_account(account_id)
            .await?
            .ok_or_else(|| PostOpsError::OAuthRefresh("x_auth_token_not_found".to_string()))?;

        if !token.is_stale(now, staleness_margin()) {
            return Ok(token.access_token);
        }

        let refreshed = self.refresh(&token, now).await?;
        Ok(refreshed.access_token)
    }

    async fn refresh(&self, token: &XAuthToken, now: DateTime<Utc>) -> Result<XAuthToken> {
        let response = self
            .client
            .refresh(&token.refresh_token)
            .await
            .map_err(|_| PostOpsError::OAuthRefresh("x_auth_refresh_failed".to_string()))?;

        let updated = XAuthToken {
            id: token.id,
            account_id: token.account_id,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: now + Duration::seconds(response.expires_in),
            scope: response.scope.unwrap_or_else(|| token.scope.clone()),
            token_type: response
                .token_type
                .unwrap_or_else(|| token.token_type.clone()),
        };
        self.store.upsert_token(&updated).await?;
        Ok(updated)
    }
}
