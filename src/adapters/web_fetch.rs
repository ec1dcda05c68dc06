//! Bounded page fetch with plain-text extraction.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use super::{WebFetchOutcome, WebFetcher};
use crate::domain::FetchStatus;

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script regex"));
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));

/// Fetch bounds; defaults match the operational limits of the worker.
#[derive(Debug, Clone)]
pub struct WebFetchConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub max_bytes: usize,
    pub max_chars: usize,
}

impl Default for WebFetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_redirects: 5,
            max_bytes: 1024 * 1024,
            max_chars: 20_000,
        }
    }
}

/// HTTP fetcher accepting only `text/html` and `text/plain`, with byte and
/// character ceilings.
pub struct WebFetchClient {
    config: WebFetchConfig,
    http: reqwest::Client,
}

impl WebFetchClient {
    pub fn new(config: WebFetchConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .expect("reqwest client");
        Self { config, http }
    }

    fn extract_text(&self, text: &str, content_type: Option<&str>) -> String {
        let is_html = content_type == Some("text/html")
            || (content_type.is_none() && text.to_lowercase().contains("<html"));
        let mut normalized = text.to_string();
        if is_html {
            normalized = SCRIPT_RE.replace_all(&normalized, " ").into_owned();
            normalized = STYLE_RE.replace_all(&normalized, " ").into_owned();
            normalized = TAG_RE.replace_all(&normalized, " ").into_owned();
        }
        let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.chars().take(self.config.max_chars).collect()
    }
}

impl Default for WebFetchClient {
    fn default() -> Self {
        Self::new(WebFetchConfig::default())
    }
}

#[async_trait]
impl WebFetcher for WebFetchClient {
    async fn fetch(&self, url: &str) -> WebFetchOutcome {
        let response = match self
            .http
            .get(url)
            .header("accept", "text/html,text/plain")
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return WebFetchOutcome::failed(url, err.to_string()),
        };

        let final_url = response.url().to_string();
        let http_status = Some(i64::from(response.status().as_u16()));
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => return WebFetchOutcome::failed(final_url, err.to_string()),
        };

        if let Some(ct) = content_type.as_deref() {
            if ct != "text/html" && ct != "text/plain" {
                return WebFetchOutcome {
                    url: final_url,
                    status: FetchStatus::Failed,
                    http_status,
                    content_type,
                    content_length: Some(body.len() as i64),
                    extracted_text: None,
                    failure_reason: Some("unsupported_content_type".to_string()),
                };
            }
        }

        if body.len() > self.config.max_bytes {
            return WebFetchOutcome {
                url: final_url,
                status: FetchStatus::Failed,
                http_status,
                content_type,
                content_length: Some(body.len() as i64),
                extracted_text: None,
                failure_reason: Some("max_bytes_exceeded".to_string()),
            };
        }

        let text = String::from_utf8_lossy(&body);
        let extracted = self.extract_text(&text, content_type.as_deref());
        WebFetchOutcome {
            url: final_url,
            status: FetchStatus::Succeeded,
            http_status,
            content_type,
            content_length: Some(body.len() as i64),
            extracted_text: Some(extracted),
            failure_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_strips_markup() {
        let client = WebFetchClient::default();
        let html = "<html><head><style>p{color:red}</style>\
                    <script>alert('x')</script></head>\
                    <body><p>Hello   <b>world</b></p></body></html>";
        assert_eq!(client.extract_text(html, Some("text/html")), "Hello world");
    }

    #[test]
    fn test_extract_text_plain_passthrough() {
        let client = WebFetchClient::default();
        assert_eq!(
            client.extract_text("plain   text\nhere", Some("text/plain")),
            "plain text here"
        );
    }

    #[test]
    fn test_extract_text_honors_max_chars() {
        let client = WebFetchClient::new(WebFetchConfig {
            max_chars: 5,
            ..Default::default()
        });
        assert_eq!(client.extract_text("abcdefghij", Some("text/plain")), "abcde");
    }
}
