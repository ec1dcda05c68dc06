mod common;

use common::{date, setup_store};
use post_ops::adapters::{
    FakeUsageClient, GeminiSummarizer, GeminiWebSearchClient, SearchClient, Summarizer,
    WebFetchClient, WebFetchConfig, WebFetcher,
};
use post_ops::domain::{FetchStatus, APP_AGENT_ID};
use post_ops::worker::UsageReconciler;
use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_web_fetch_extracts_html_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "<html><head><script>var x=1;</script><style>p{}</style></head>\
                 <body><h1>Pricing</h1><p>Plans start   at $5.</p></body></html>"
                    .as_bytes()
                    .to_vec(),
                "text/html; charset=utf-8",
            ),
        )
        .mount(&server)
        .await;

    let fetcher = WebFetchClient::default();
    let outcome = fetcher.fetch(&format!("{}/page", server.uri())).await;

    assert_eq!(outcome.status, FetchStatus::Succeeded);
    assert_eq!(outcome.http_status, Some(200));
    assert_eq!(outcome.content_type.as_deref(), Some("text/html"));
    assert_eq!(
        outcome.extracted_text.as_deref(),
        Some("Pricing Plans start at $5.")
    );
}

#[tokio::test]
async fn test_web_fetch_rejects_unsupported_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0u8; 16]),
        )
        .mount(&server)
        .await;

    let fetcher = WebFetchClient::default();
    let outcome = fetcher.fetch(&server.uri()).await;
    assert_eq!(outcome.status, FetchStatus::Failed);
    assert_eq!(
        outcome.failure_reason.as_deref(),
        Some("unsupported_content_type")
    );
    assert!(outcome.extracted_text.is_none());
}

#[tokio::test]
async fn test_web_fetch_enforces_byte_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("x".repeat(64)),
        )
        .mount(&server)
        .await;

    let fetcher = WebFetchClient::new(WebFetchConfig {
        max_bytes: 32,
        ..Default::default()
    });
    let outcome = fetcher.fetch(&server.uri()).await;
    assert_eq!(outcome.status, FetchStatus::Failed);
    assert_eq!(outcome.failure_reason.as_deref(), Some("max_bytes_exceeded"));
}

#[tokio::test]
async fn test_web_fetch_network_error_is_encoded() {
    let fetcher = WebFetchClient::default();
    let outcome = fetcher.fetch("http://127.0.0.1:1/unreachable").await;
    assert_eq!(outcome.status, FetchStatus::Failed);
    assert!(outcome.failure_reason.is_some());
}

fn gemini_envelope(inner: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"parts": [{"text": inner.to_string()}]}
        }]
    })
}

#[tokio::test]
async fn test_gemini_search_normalizes_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            serde_json::json!({
                "results": [
                    {"title": "Hit", "snippet": "useful snippet", "url": "https://a.example"},
                    {"title": "No url", "snippet": "dropped", "url": ""},
                ],
                "notes": {"grounded": true},
            }),
        )))
        .mount(&server)
        .await;

    let client = GeminiWebSearchClient::with_endpoint_base("key", None, server.uri());
    let results = client.search("query", 3).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Hit");
    assert_eq!(results[0].url, "https://a.example");
}

#[tokio::test]
async fn test_gemini_search_surfaces_http_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = GeminiWebSearchClient::with_endpoint_base("key", None, server.uri());
    assert!(client.search("query", 3).await.is_err());
}

#[tokio::test]
async fn test_gemini_summarizer_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            serde_json::json!({
                "summary": "サービスの料金と変更手順の要約",
                "key_points": ["point 1", "point 2"],
                "confidence": "high",
                "safe_to_use": true,
            }),
        )))
        .mount(&server)
        .await;

    let summarizer = GeminiSummarizer::with_endpoint_base("key", None, server.uri());
    let summary = summarizer.summarize("page text").await.unwrap();
    assert_eq!(summary.key_points.len(), 2);
    assert_eq!(summary.confidence, "high");
    assert!(summary.safe_to_use);
}

#[tokio::test]
async fn test_gemini_summarizer_requires_summary_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            serde_json::json!({
                "summary": "",
                "key_points": [],
                "confidence": "low",
                "safe_to_use": false,
            }),
        )))
        .mount(&server)
        .await;

    let summarizer = GeminiSummarizer::with_endpoint_base("key", None, server.uri());
    assert!(summarizer.summarize("page text").await.is_err());
}

#[tokio::test]
async fn test_usage_reconcile_writes_app_wide_row() {
    let store = setup_store().await;
    let usage_date = date(2026, 1, 8);

    let reconciler = UsageReconciler::new(store.clone(), Some(Decimal::new(3, 2)));
    let client = FakeUsageClient { units: 7 };
    let report = reconciler.run(Some(&client), usage_date).await;

    assert!(report.x_usage_reconciled);
    assert_eq!(report.x_usage_units, Some(7));

    let log = store
        .get_cost_log(APP_AGENT_ID, usage_date)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.x_usage_units, 7);
    // 7 × 0.03 rounded to 2 decimals
    assert_eq!(log.x_api_cost_actual, Some(Decimal::new(21, 2)));
    assert_eq!(log.x_usage_raw["source"], "fake");
}

#[tokio::test]
async fn test_usage_reconcile_without_unit_price_leaves_actual_null() {
    let store = setup_store().await;
    let usage_date = date(2026, 1, 8);

    let reconciler = UsageReconciler::new(store.clone(), None);
    let client = FakeUsageClient { units: 11 };
    reconciler.run(Some(&client), usage_date).await;

    let log = store
        .get_cost_log(APP_AGENT_ID, usage_date)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.x_usage_units, 11);
    assert!(log.x_api_cost_actual.is_none());
}

#[tokio::test]
async fn test_usage_reconcile_disabled_without_client() {
    let store = setup_store().await;
    let reconciler = UsageReconciler::new(store.clone(), None);
    let report = reconciler.run(None, date(2026, 1, 8)).await;
    assert!(!report.x_usage_reconciled);
    assert!(!report.usage_fetch_failed);
}
