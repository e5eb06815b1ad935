//! HTTP integration tests for the Tangle REST API
//!
//! Requests go through the full Axum router via `oneshot`, backed either by an
//! in-process stub provider or by the real OpenAI-compatible client pointed at
//! a wiremock server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tangle_core::provider::{ClientConfig, GROQ_DEFAULT_MODEL};
use tangle_core::{
    ChatProvider, Completion, CompletionRequest, MockProvider, OpenAiCompatibleClient, ProviderError,
    TangleConfig,
};
use tangle_server::http::{build_router, HttpState};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FENCED_EMPTY_GRAPH: &str = "```json\n{\"nodes\":[],\"edges\":[],\"insights\":[]}\n```";

/// Provider that always answers with the same text.
struct CannedProvider(&'static str);

#[async_trait]
impl ChatProvider for CannedProvider {
    async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<Completion, ProviderError> {
        Ok(Completion::Raw(self.0.to_string()))
    }

    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned-model"
    }
}

fn router_with(provider: Arc<dyn ChatProvider>) -> axum::Router {
    build_router(Arc::new(HttpState::new(provider, TangleConfig::default())))
}

fn live_provider(mock_server: &MockServer) -> Arc<dyn ChatProvider> {
    let client = OpenAiCompatibleClient::new(ClientConfig {
        name: "groq".to_string(),
        api_key: "test-api-key".to_string(),
        base_url: mock_server.uri(),
        model: GROQ_DEFAULT_MODEL.to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("Failed to create test client");
    Arc::new(client)
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

async fn post_graph(app: axum::Router, body: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/graph")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ===========================================================================
// End-to-end: fenced provider output is recovered exactly
// ===========================================================================
#[tokio::test]
async fn test_fenced_provider_output_end_to_end() {
    let app = router_with(Arc::new(CannedProvider(FENCED_EMPTY_GRAPH)));

    let (status, body) =
        post_graph(app, r#"{"text": "I feel tired and anxious about work"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "nodes": [], "edges": [], "insights": [] }));
}

// ===========================================================================
// Live client against wiremock: success path
// ===========================================================================
#[tokio::test]
async fn test_live_provider_success() {
    let mock_server = MockServer::start().await;
    let graph = r#"Sure! Here is your graph: {"nodes": [{"id": "work", "label": "Work", "category": "problem"},], "edges": [], "insights": ["Work weighs on you."]}"#;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(graph)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = router_with(live_provider(&mock_server));
    let (status, body) = post_graph(app, r#"{"text": "work is heavy"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"].as_array().unwrap().len(), 1);
    assert_eq!(body["nodes"][0]["category"], "problem");
    assert_eq!(body["insights"][0], "Work weighs on you.");
}

// ===========================================================================
// Live client against wiremock: upstream failure → 429
// ===========================================================================
#[tokio::test]
async fn test_live_provider_auth_failure_is_429() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Invalid API Key" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = router_with(live_provider(&mock_server));
    let (status, body) = post_graph(app, r#"{"text": "anything at all"}"#).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.starts_with("AI backend error: "), "got: {}", msg);
    assert!(msg.contains("Invalid API Key"), "got: {}", msg);
    assert_eq!(body.as_object().unwrap().len(), 1);
}

// ===========================================================================
// Live client against wiremock: unreachable provider → 429
// ===========================================================================
#[tokio::test]
async fn test_unreachable_provider_is_429() {
    let mock_server = MockServer::start().await;
    let provider = live_provider(&mock_server);
    drop(mock_server);

    let app = router_with(provider);
    let (status, body) = post_graph(app, r#"{"text": "anything at all"}"#).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().starts_with("AI backend error: "));
}

// ===========================================================================
// Live client against wiremock: unrecoverable output → 500
// ===========================================================================
#[tokio::test]
async fn test_live_provider_invalid_json_is_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("not json at all")))
        .mount(&mock_server)
        .await;

    let app = router_with(live_provider(&mock_server));
    let (status, body) = post_graph(app, r#"{"text": "anything at all"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Model returned invalid JSON. Please try again." })
    );
}

// ===========================================================================
// Live client: null message content is an unrecoverable answer → 500
// ===========================================================================
#[tokio::test]
async fn test_null_content_is_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": null } }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = router_with(live_provider(&mock_server));
    let (status, body) = post_graph(app, r#"{"text": "anything at all"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "Model returned invalid JSON. Please try again." })
    );
}

// ===========================================================================
// Live client: no choices at all is a provider failure → 429
// ===========================================================================
#[tokio::test]
async fn test_empty_choices_is_429() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&mock_server)
        .await;

    let app = router_with(live_provider(&mock_server));
    let (status, body) = post_graph(app, r#"{"text": "anything at all"}"#).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body,
        json!({ "error": "AI backend error: completion contained no choices" })
    );
}

// ===========================================================================
// Oversized body → 413 with a JSON error
// ===========================================================================
#[tokio::test]
async fn test_oversized_body_is_json_413() {
    let mut config = TangleConfig::default();
    config.http.max_body_bytes = 64;
    let app = build_router(Arc::new(HttpState::new(Arc::new(MockProvider), config)));

    let text = "word ".repeat(100);
    let (status, body) = post_graph(app, &json!({ "text": text }).to_string()).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string(), "got: {}", body);
    assert_eq!(body.as_object().unwrap().len(), 1);
}

// ===========================================================================
// Validation: missing text → 400, provider never called
// ===========================================================================
#[tokio::test]
async fn test_missing_text_is_400_without_provider_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = router_with(live_provider(&mock_server));
    let (status, body) = post_graph(app, r#"{"text": "  "}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No text provided" }));
}

// ===========================================================================
// Mock mode through the router
// ===========================================================================
#[tokio::test]
async fn test_mock_mode_via_router() {
    let app = router_with(Arc::new(MockProvider));
    let (status, body) = post_graph(app, r#"{"text": "Deadlines, deadlines and more deadlines"}"#).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["deadlines", "more"]);
    assert_eq!(body["edges"].as_array().unwrap().len(), 1);
}

// ===========================================================================
// Body without a JSON content type is still read
// ===========================================================================
#[tokio::test]
async fn test_plain_text_content_type_accepted() {
    let app = router_with(Arc::new(MockProvider));
    let req = Request::builder()
        .method("POST")
        .uri("/api/graph")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"text": "sleeping badly lately"}"#))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ===========================================================================
// CORS: any origin allowed
// ===========================================================================
#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let app = router_with(Arc::new(MockProvider));
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/graph")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_cors_header_on_simple_request() {
    let app = router_with(Arc::new(MockProvider));
    let req = Request::builder()
        .method("POST")
        .uri("/api/graph")
        .header(header::ORIGIN, "https://example.org")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text": "hello there world"}"#))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

// ===========================================================================
// GET /health and GET /version via oneshot
// ===========================================================================
#[tokio::test]
async fn test_health_and_version_endpoints() {
    let app = router_with(Arc::new(MockProvider));

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["provider"], "mock");

    let resp = app
        .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["protocol"], "tangle/1");
}
