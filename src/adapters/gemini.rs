//! Gemini-backed web search and summarization.
//!
//! Both clients constrain the model with a JSON response schema and parse the
//! first candidate part that carries JSON text.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{SearchClient, Summarizer};
use crate::domain::{FetchSummary, PostOpsError, Result, SearchResult};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const LLM_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_TOP_K: usize = 5;
const DEFAULT_SNIPPET_LIMIT: usize = 300;

fn first_json_part(body: &Value) -> Result<Value> {
    let candidates = body
        .get("candidates")
        .and_then(Value::as_array)
        .filter(|candidates| !candidates.is_empty())
        .ok_or_else(|| PostOpsError::Search("response did not include candidates".to_string()))?;

    let parts = candidates[0]
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            if text.trim().is_empty() {
                continue;
            }
            let parsed: Value = serde_json::from_str(text)
                .map_err(|_| PostOpsError::Search("JSON response was invalid".to_string()))?;
            if parsed.is_object() {
                return Ok(parsed);
            }
        }
    }
    Err(PostOpsError::Search(
        "response did not include JSON text".to_string(),
    ))
}

/// Grounded web search through `generateContent`.
pub struct GeminiWebSearchClient {
    api_key: String,
    model: String,
    endpoint_base: String,
    snippet_limit: usize,
    http: reqwest::Client,
}

impl GeminiWebSearchClient {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self::with_endpoint_base(api_key, model, DEFAULT_ENDPOINT_BASE)
    }

    pub fn with_endpoint_base(
        api_key: impl Into<String>,
        model: Option<String>,
        endpoint_base: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint_base: endpoint_base.into().trim_end_matches('/').to_string(),
            snippet_limit: DEFAULT_SNIPPET_LIMIT,
            http,
        }
    }

    fn request_body(query: &str, top_k: usize) -> Value {
        serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": format!("Find web results for: {query}")}]}],
            "tools": [{"google_search": {}}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "results": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "title": {"type": "STRING"},
                                    "snippet": {"type": "STRING"},
                                    "url": {"type": "STRING"},
                                },
                                "required": ["title", "snippet", "url"],
                            },
                        },
                        "notes": {
                            "type": "OBJECT",
                            "properties": {"grounded": {"type": "BOOLEAN"}},
                            "required": ["grounded"],
                        },
                    },
                    "required": ["results", "notes"],
                },
            },
            "systemInstruction": {
                "parts": [{
                    "text": format!(
                        "Use Google Search grounding. Return only valid JSON matching schema. \
                         Limit results to {top_k} items."
                    ),
                }]
            },
        })
    }

    fn normalize(&self, payload: &Value, top_k: usize) -> Vec<SearchResult> {
        let mut results = Vec::new();
        for item in payload
            .get("results")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .take(top_k)
        {
            let url = item
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            if url.is_empty() {
                continue;
            }
            let title = item
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            let snippet: String = item
                .get("snippet")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .chars()
                .take(self.snippet_limit)
                .collect();
            results.push(SearchResult {
                title,
                snippet,
                url,
            });
        }
        results
    }
}

#[async_trait]
impl SearchClient for GeminiWebSearchClient {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let top_k = k.clamp(1, MAX_TOP_K);
        let endpoint = format!(
            "{}/models/{}:generateContent",
            self.endpoint_base, self.model
        );
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(query, top_k))
            .send()
            .await
            .map_err(|e| PostOpsError::Search(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostOpsError::Search(format!("status={}", status.as_u16())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PostOpsError::Search(e.to_string()))?;
        let parsed = first_json_part(&body)?;
        Ok(self.normalize(&parsed, top_k))
    }
}

/// Structured page summarization through `generateContent`.
pub struct GeminiSummarizer {
    api_key: String,
    model: String,
    endpoint_base: String,
    max_input_chars: usize,
    http: reqwest::Client,
}

impl GeminiSummarizer {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self::with_endpoint_base(api_key, model, DEFAULT_ENDPOINT_BASE)
    }

    pub fn with_endpoint_base(
        api_key: impl Into<String>,
        model: Option<String>,
        endpoint_base: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint_base: endpoint_base.into().trim_end_matches('/').to_string(),
            max_input_chars: 12_000,
            http,
        }
    }

    fn request_body(&self, extracted_text: &str) -> Value {
        let trimmed: String = extracted_text.chars().take(self.max_input_chars).collect();
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{
                    "text": format!(
                        "Summarize this web content in Japanese for internal analytics.\nContent:\n{trimmed}"
                    ),
                }],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "summary": {"type": "STRING"},
                        "key_points": {"type": "ARRAY", "items": {"type": "STRING"}},
                        "confidence": {"type": "STRING", "enum": ["low", "med", "high"]},
                        "safe_to_use": {"type": "BOOLEAN"},
                    },
                    "required": ["summary", "key_points", "confidence", "safe_to_use"],
                },
            },
            "systemInstruction": {
                "parts": [{
                    "text": "Return only JSON. summary should be around 200-400 Japanese characters. key_points max 5.",
                }]
            },
        })
    }

    fn parse_summary(parsed: &Value) -> Result<FetchSummary> {
        let summary = parsed
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        if summary.is_empty() {
            return Err(PostOpsError::Summarize("summary is required".to_string()));
        }

        let key_points = parsed
            .get("key_points")
            .and_then(Value::as_array)
            .map(|points| {
                points
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|point| !point.is_empty())
                    .take(5)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let confidence = match parsed.get("confidence").and_then(Value::as_str) {
            Some(level @ ("low" | "med" | "high")) => level.to_string(),
            _ => "low".to_string(),
        };

        Ok(FetchSummary {
            summary,
            key_points,
            confidence,
            safe_to_use: parsed
                .get("safe_to_use")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            extra: Default::default(),
        })
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, extracted_text: &str) -> Result<FetchSummary> {
        let endpoint = format!(
            "{}/models/{}:generateContent",
            self.endpoint_base, self.model
        );
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(extracted_text))
            .send()
            .await
            .map_err(|e| PostOpsError::Summarize(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostOpsError::Summarize(format!(
                "status={}",
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PostOpsError::Summarize(e.to_string()))?;
        let parsed =
            first_json_part(&body).map_err(|e| PostOpsError::Summarize(e.to_string()))?;
        Self::parse_summary(&parsed)
    }
}
