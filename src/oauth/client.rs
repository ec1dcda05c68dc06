//! Token-endpoint client: authorization-code exchange and refresh.

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::OAuthConfig;
use crate::domain::{PostOpsError, Result};

const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);

/// Parsed token-endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// OAuth client for the platform's authorize/token endpoints.
#[derive(Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(TOKEN_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self { config, http }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Provider authorize URL carrying the PKCE parameters.
    pub fn build_authorize_url(&self, state: &str, code_challenge: &str) -> Result<String> {
        let client_id = self.config.require_client_id()?;
        let redirect_uri = self.config.require_redirect_uri()?;
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| PostOpsError::config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenResponse> {
        let client_id = self.config.require_client_id()?.to_string();
        let redirect_uri = self.config.require_redirect_uri()?.to_string();
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &redirect_uri),
            ("client_id", &client_id),
            ("code_verifier", code_verifier),
        ];
        self.token_request(&form).await
    }

    /// Refresh-token grant.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let client_id = self.config.require_client_id()?.to_string();
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &client_id),
        ];
        self.token_request(&form).await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let client_id = self.config.require_client_id()?;
        let mut request = self.http.post(&self.config.token_url).form(form);
        if let Some(secret) = &self.config.client_secret {
            request = request.basic_auth(client_id, Some(secret));
        }

        let response = request.send().await.map_err(|e| {
            PostOpsError::OAuth(format!(
                "x_oauth_token_request_network_error:{}",
                network_error_class(&e)
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostOpsError::OAuth(format!(
                "x_oauth_token_request_failed:{}",
                status.as_u16()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|_| PostOpsError::OAuth("x_oauth_token_invalid".to_string()))
    }
}

fn network_error_class(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_request() {
        "request"
    } else {
        "other"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_carries_pkce_params() {
        let mut config = OAuthConfig::default();
        config.client_id = Some("cid".to_string());
        config.redirect_uri = Some("https://app.example/oauth/x/callback".to_string());
        let client = OAuthClient::new(config);

        let url = client.build_authorize_url("state-1", "challenge-1").unwrap();
        assert!(url.starts_with("https://x.com/i/oauth2/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("state=state-1"));
        assert!(url.contains("code_challenge=challenge-1"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("scope=tweet.write+users.read+offline.access+tweet.read"));
    }

    #[test]
    fn test_authorize_url_requires_client_id() {
        let client = OAuthClient::new(OAuthConfig::default());
        assert!(client.build_authorize_url("s", "c").is_err());
    }
}
