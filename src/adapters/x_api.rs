//! Real platform client over the v2 HTTP API.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{PlatformClient, Poster, TargetPostSource};
use crate::domain::{
    DailyUsage, ExternalPost, ExternalPostMetrics, PostOpsError, PostType, Result, TargetPost,
};

const API_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_BASE_URL: &str = "https://api.x.com/2";

/// Status-URL matcher: `x.com`/`twitter.com`, `/status/` or `/i/web/status/`,
/// optional handle segment, optional trailing path/query/fragment.
static TWEET_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:https?://)?(?:www\.)?(?:x\.com|twitter\.com)/(?:(?:[^/?#]+/)?status|i/web/status)/(\d+)(?:[/?#]|$)",
    )
    .expect("tweet url regex")
});

/// Numeric id from a platform status URL, None when the URL does not match.
pub fn extract_tweet_id(url: &str) -> Option<String> {
    TWEET_URL_RE
        .captures(url)
        .map(|captures| captures[1].to_string())
}

fn int_metric(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("valid time"));
    (start, start + chrono::Duration::days(1))
}

fn rfc3339_z(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Bearer-token client for the platform API.
pub struct RealXClient {
    bearer_token: String,
    user_id: Mutex<Option<String>>,
    base_url: String,
    http: reqwest::Client,
}

impl RealXClient {
    pub fn new(bearer_token: impl Into<String>, user_id: Option<String>) -> Self {
        Self::with_base_url(bearer_token, user_id, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        bearer_token: impl Into<String>,
        user_id: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            bearer_token: bearer_token.into(),
            user_id: Mutex::new(user_id),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn request_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| {
                PostOpsError::PlatformApi(format!("request failed: {path} network_error={e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostOpsError::PlatformApi(format!(
                "request failed: {path} status={}",
                status.as_u16()
            )));
        }
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                PostOpsError::PlatformApi(format!("request failed: {path} network_error={e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostOpsError::PlatformApi(format!(
                "request failed: {path} status={}",
                status.as_u16()
            )));
        }
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    async fn resolve_user_id_inner(&self) -> Result<String> {
        if let Some(cached) = self.user_id.lock().expect("user id lock").clone() {
            return Ok(cached);
        }

        let url = format!("{}/users/me", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                PostOpsError::PlatformApi(format!("request failed: users/me network_error={e}"))
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(PostOpsError::MissingUserId(
                "unable to resolve user id from /2/users/me; set X_USER_ID".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(PostOpsError::PlatformApi(format!(
                "request failed: users/me status={}",
                status.as_u16()
            )));
        }

        let payload: Value = response.json().await.unwrap_or(Value::Null);
        let id = payload
            .get("data")
            .and_then(|data| data.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PostOpsError::MissingUserId(
                    "unable to resolve user id from /2/users/me; set X_USER_ID".to_string(),
                )
            })?
            .to_string();
        *self.user_id.lock().expect("user id lock") = Some(id.clone());
        Ok(id)
    }

    /// Create a tweet, optionally threaded under or quoting another tweet.
    pub async fn create_tweet(
        &self,
        text: &str,
        in_reply_to_tweet_id: Option<&str>,
        quote_tweet_id: Option<&str>,
    ) -> Result<String> {
        let mut body = serde_json::json!({"text": text});
        if let Some(reply_id) = in_reply_to_tweet_id {
            body["reply"] = serde_json::json!({"in_reply_to_tweet_id": reply_id});
        }
        if let Some(quote_id) = quote_tweet_id {
            body["quote_tweet_id"] = Value::String(quote_id.to_string());
        }

        let payload = self.post_json("tweets", &body).await?;
        payload
            .get("data")
            .and_then(|data| data.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PostOpsError::PlatformApi("post response missing tweet id".to_string())
            })
    }

    fn media_map(includes: Option<&Value>) -> HashMap<String, String> {
        let mut mapping = HashMap::new();
        let Some(media) = includes.and_then(|inc| inc.get("media")).and_then(Value::as_array)
        else {
            return mapping;
        };
        for item in media {
            let key = item.get("media_key").and_then(Value::as_str);
            let url = item
                .get("url")
                .or_else(|| item.get("preview_image_url"))
                .and_then(Value::as_str);
            if let (Some(key), Some(url)) = (key, url) {
                mapping.insert(key.to_string(), url.to_string());
            }
        }
        mapping
    }

    pub(crate) fn extract_usage_units(payload: &Value) -> i64 {
        match payload.get("data") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| int_metric(item.get("usage")))
                .sum(),
            Some(Value::Object(data)) => {
                if data.contains_key("usage") {
                    int_metric(data.get("usage"))
                } else {
                    data.get("totals")
                        .and_then(Value::as_object)
                        .map(|totals| int_metric(totals.get("usage")))
                        .unwrap_or(0)
                }
            }
            _ => 0,
        }
    }
}

#[async_trait]
impl PlatformClient for RealXClient {
    async fn resolve_user_id(&self) -> Result<String> {
        self.resolve_user_id_inner().await
    }

    async fn list_posts(
        &self,
        _agent_id: i64,
        target_date: NaiveDate,
    ) -> Result<Vec<ExternalPost>> {
        let user_id = self.resolve_user_id_inner().await?;
        let (start, end) = day_bounds(target_date);
        let params = [
            ("max_results", "100".to_string()),
            ("tweet.fields", "created_at,attachments".to_string()),
            ("expansions", "attachments.media_keys".to_string()),
            ("media.fields", "url,preview_image_url".to_string()),
            ("start_time", rfc3339_z(start)),
            ("end_time", rfc3339_z(end)),
        ];
        let payload = self
            .request_json(&format!("users/{user_id}/tweets"), &params)
            .await?;

        let media_urls = Self::media_map(payload.get("includes"));
        let mut posts = Vec::new();
        for item in payload
            .get("data")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let (Some(tweet_id), Some(created_raw), Some(text)) = (
                item.get("id").and_then(Value::as_str),
                item.get("created_at").and_then(Value::as_str),
                item.get("text").and_then(Value::as_str),
            ) else {
                continue;
            };
            let Some(created_at) = parse_created_at(created_raw) else {
                continue;
            };
            if created_at < start || created_at >= end {
                continue;
            }
            let post_media = item
                .get("attachments")
                .and_then(|attachments| attachments.get("media_keys"))
                .and_then(Value::as_array)
                .map(|keys| {
                    keys.iter()
                        .filter_map(Value::as_str)
                        .filter_map(|key| media_urls.get(key).cloned())
                        .collect()
                })
                .unwrap_or_default();
            posts.push(ExternalPost {
                external_id: tweet_id.to_string(),
                posted_at: created_at,
                text: text.to_string(),
                post_type: PostType::Tweet,
                media_urls: post_media,
            });
        }
        Ok(posts)
    }

    async fn get_post_metrics(&self, post: &ExternalPost) -> Result<ExternalPostMetrics> {
        let params = [
            ("ids", post.external_id.clone()),
            (
                "tweet.fields",
                "public_metrics,organic_metrics,non_public_metrics".to_string(),
            ),
        ];
        let payload = self.request_json("tweets", &params).await?;

        let Some(tweet) = payload
            .get("data")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
        else {
            return Ok(ExternalPostMetrics {
                external_id: post.external_id.clone(),
                ..Default::default()
            });
        };

        let public = tweet.get("public_metrics");
        let organic = tweet.get("organic_metrics");
        let non_public = tweet.get("non_public_metrics");

        let mut impressions = int_metric(organic.and_then(|m| m.get("impression_count")));
        if impressions == 0 {
            impressions = int_metric(non_public.and_then(|m| m.get("impression_count")));
        }
        let mut clicks = int_metric(organic.and_then(|m| m.get("url_link_clicks")));
        if clicks == 0 {
            clicks = int_metric(non_public.and_then(|m| m.get("url_link_clicks")));
        }

        Ok(ExternalPostMetrics {
            external_id: post.external_id.clone(),
            impressions,
            likes: int_metric(public.and_then(|m| m.get("like_count"))),
            replies: int_metric(public.and_then(|m| m.get("reply_count"))),
            retweets: int_metric(public.and_then(|m| m.get("retweet_count"))),
            clicks,
            impressions_unavailable: impressions == 0,
        })
    }

    async fn get_daily_usage(&self, usage_date: NaiveDate) -> Result<DailyUsage> {
        let (start, end) = day_bounds(usage_date);
        let params = [
            ("start_time", rfc3339_z(start)),
            ("end_time", rfc3339_z(end)),
        ];
        let payload = self.request_json("usage/tweets", &params).await?;
        Ok(DailyUsage {
            usage_date,
            units: Self::extract_usage_units(&payload),
            raw: payload,
        })
    }
}

/// Publisher using one bearer token per agent, minted by the token provider
/// just before the batch runs.
pub struct RealPoster {
    account_tokens: HashMap<i64, String>,
    base_url: String,
}

impl RealPoster {
    pub fn new(account_tokens: HashMap<i64, String>) -> Self {
        Self::with_base_url(account_tokens, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(account_tokens: HashMap<i64, String>, base_url: impl Into<String>) -> Self {
        Self {
            account_tokens,
            base_url: base_url.into(),
        }
    }

    fn client_for_agent(&self, agent_id: i64) -> Result<RealXClient> {
        let token = self
            .account_tokens
            .get(&agent_id)
            .ok_or_else(|| PostOpsError::TokenNotFound(agent_id))?;
        Ok(RealXClient::with_base_url(token, None, &self.base_url))
    }

    fn target_id(target_post_url: &str) -> Result<String> {
        extract_tweet_id(target_post_url)
            .ok_or_else(|| PostOpsError::InvalidTargetUrl(target_post_url.to_string()))
    }
}

#[async_trait]
impl Poster for RealPoster {
    async fn post_text(&self, agent_id: i64, text: &str) -> Result<String> {
        self.client_for_agent(agent_id)?
            .create_tweet(text, None, None)
            .await
    }

    async fn post_thread(&self, agent_id: i64, parts: &[String]) -> Result<String> {
        if parts.is_empty() {
            return Err(PostOpsError::internal("thread_parts_required"));
        }
        let client = self.client_for_agent(agent_id)?;
        let first_id = client.create_tweet(&parts[0], None, None).await?;
        let mut prev_id = first_id.clone();
        for part in &parts[1..] {
            prev_id = client.create_tweet(part, Some(&prev_id), None).await?;
        }
        Ok(first_id)
    }

    async fn post_reply(
        &self,
        agent_id: i64,
        target_post_url: &str,
        text: &str,
    ) -> Result<String> {
        let target_id = Self::target_id(target_post_url)?;
        self.client_for_agent(agent_id)?
            .create_tweet(text, Some(&target_id), None)
            .await
    }

    async fn post_quote_rt(
        &self,
        agent_id: i64,
        target_post_url: &str,
        text: &str,
    ) -> Result<String> {
        let target_id = Self::target_id(target_post_url)?;
        self.client_for_agent(agent_id)?
            .create_tweet(text, None, Some(&target_id))
            .await
    }
}

/// Target-post harvester resolving each handle to its recent tweets.
pub struct RealTargetPostSource {
    client: RealXClient,
    per_handle: i64,
}

impl RealTargetPostSource {
    pub fn new(client: RealXClient, per_handle: i64) -> Self {
        Self {
            client,
            per_handle: per_handle.clamp(1, 10),
        }
    }
}

#[async_trait]
impl TargetPostSource for RealTargetPostSource {
    async fn list_target_posts(
        &self,
        _agent_id: i64,
        handles: &[String],
        limit: usize,
    ) -> Result<Vec<TargetPost>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut posts = Vec::new();
        for handle in handles {
            let normalized = handle.trim_start_matches('@').trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }

            // Unresolvable handles are skipped, not fatal.
            let Ok(user_payload) = self
                .client
                .request_json(&format!("users/by/username/{normalized}"), &[])
                .await
            else {
                continue;
            };
            let Some(user_id) = user_payload
                .get("data")
                .and_then(|data| data.get("id"))
                .and_then(Value::as_str)
            else {
                continue;
            };

            let params = [
                ("max_results", self.per_handle.to_string()),
                ("tweet.fields", "created_at".to_string()),
            ];
            let Ok(tweets_payload) = self
                .client
                .request_json(&format!("users/{user_id}/tweets"), &params)
                .await
            else {
                continue;
            };

            for item in tweets_payload
                .get("data")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let (Some(tweet_id), Some(text)) = (
                    item.get("id").and_then(Value::as_str),
                    item.get("text").and_then(Value::as_str),
                ) else {
                    continue;
                };
                let created_at = item
                    .get("created_at")
                    .and_then(Value::as_str)
                    .and_then(parse_created_at)
                    .unwrap_or_else(Utc::now);
                posts.push(TargetPost {
                    external_id: tweet_id.to_string(),
                    url: format!("https://x.com/{normalized}/status/{tweet_id}"),
                    author_handle: normalized.clone(),
                    text: text.to_string(),
                    created_at,
                });
                if posts.len() >= limit {
                    return Ok(posts);
                }
            }
        }
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tweet_id_accepts_status_urls() {
        for url in [
            "https://x.com/u/status/12345",
            "https://twitter.com/u/status/12345",
            "https://x.com/i/web/status/12345",
            "https://x.com/u/status/12345/photo/1",
            "https://x.com/u/status/12345?s=20",
            "http://www.x.com/handle/status/12345#anchor",
            "x.com/handle/status/12345",
        ] {
            assert_eq!(extract_tweet_id(url).as_deref(), Some("12345"), "{url}");
        }
    }

    #[test]
    fn test_extract_tweet_id_rejects_non_status_urls() {
        for url in [
            "https://example.com/not-a-status-url",
            "https://x.com/u/statuses/12345",
            "https://x.com/u/status/abc",
            "https://x.com/u/status/",
            "not a url at all",
        ] {
            assert_eq!(extract_tweet_id(url), None, "{url}");
        }
    }

    #[test]
    fn test_usage_unit_extraction_shapes() {
        let list = serde_json::json!({"data": [{"usage": 3}, {"usage": "4"}, {"other": 1}]});
        assert_eq!(RealXClient::extract_usage_units(&list), 7);

        let scalar = serde_json::json!({"data": {"usage": 11}});
        assert_eq!(RealXClient::extract_usage_units(&scalar), 11);

        let totals = serde_json::json!({"data": {"totals": {"usage": 9}}});
        assert_eq!(RealXClient::extract_usage_units(&totals), 9);

        let empty = serde_json::json!({});
        assert_eq!(RealXClient::extract_usage_units(&empty), 0);
    }
}
