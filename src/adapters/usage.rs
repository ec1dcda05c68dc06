//! Platform usage-units endpoint client.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;
use std::time::Duration;

use super::x_api::RealXClient;
use super::UsageClient;
use crate::domain::{DailyUsage, PostOpsError, Result};

const USAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Thin client for `GET /2/usage/tweets`.
pub struct XUsageClient {
    bearer_token: String,
    base_url: String,
    http: reqwest::Client,
}

impl XUsageClient {
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self::with_base_url(bearer_token, super::x_api::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(bearer_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(USAGE_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            bearer_token: bearer_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }
}

#[async_trait]
impl UsageClient for XUsageClient {
    async fn fetch_daily_usage(&self, usage_date: NaiveDate) -> Result<DailyUsage> {
        let start = Utc.from_utc_datetime(&usage_date.and_hms_opt(0, 0, 0).expect("valid time"));
        let end = start + chrono::Duration::days(1);
        let params = [
            (
                "start_time",
                start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ),
            (
                "end_time",
                end.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ),
        ];

        let response = self
            .http
            .get(format!("{}/usage/tweets", self.base_url))
            .bearer_auth(&self.bearer_token)
            .header("Accept", "application/json")
            .query(&params)
            .send()
            .await
            .map_err(|e| PostOpsError::Usage(format!("usage_api_network_{e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostOpsError::Usage(format!(
                "usage_api_status_{}",
                status.as_u16()
            )));
        }

        let payload: Value = response.json().await.unwrap_or(Value::Null);
        Ok(DailyUsage {
            usage_date,
            units: RealXClient::extract_usage_units(&payload),
            raw: payload,
        })
    }
}
