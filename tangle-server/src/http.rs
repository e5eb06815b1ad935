//! Tangle HTTP API
//!
//! Axum-based HTTP server that turns free-form text into a thought graph.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - POST /api/graph — text in, `{nodes, edges, insights}` out
//! - GET  /health    — liveness plus the provider chosen at startup
//! - GET  /version   — server version info
//!
//! Cross-origin requests are accepted from any origin. Bodies above
//! `http.max_body_bytes` are refused with 413 and the usual error payload.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use tangle_core::{generate_graph, ChatProvider, GenerationSettings, GraphRequest, TangleConfig};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

/// Shared state for all HTTP handlers. Built once at startup, never mutated.
#[derive(Clone)]
pub struct HttpState {
    pub provider: Arc<dyn ChatProvider>,
    pub config: TangleConfig,
}

impl HttpState {
    pub fn new(provider: Arc<dyn ChatProvider>, config: TangleConfig) -> Self {
        Self { provider, config }
    }

    fn settings(&self) -> GenerationSettings {
        GenerationSettings::from(&self.config.provider)
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let body_limit = state.config.http.max_body_bytes;
    Router::new()
        .route(
            "/api/graph",
            post(graph_handler).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    provider: Arc<dyn ChatProvider>,
    config: TangleConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = config.listen_addr();
    let state = Arc::new(HttpState::new(provider, config));

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Tangle HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

/// Inner graph — decodes the body, runs the pipeline, maps the outcome.
///
/// 200 carries the recovered model output untouched. Errors carry only
/// `{"error": ...}`: 400 for missing text, 429 for any provider failure,
/// 500 when the model output cannot be recovered.
pub async fn graph_inner(state: &HttpState, body: &[u8]) -> (StatusCode, serde_json::Value) {
    let request = GraphRequest::from_slice(body);
    let span = tracing::info_span!(
        "graph_request",
        request_id = %Uuid::new_v4(),
        provider = state.provider.name()
    );

    let result = generate_graph(state.provider.as_ref(), state.settings(), &request)
        .instrument(span)
        .await;

    match result {
        Ok(value) => (StatusCode::OK, value),
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, e.to_body())
        }
    }
}

/// Inner health — reports the provider selected at startup (pure, no IO).
pub fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "provider": state.provider.name(),
            "model": state.provider.model(),
        }),
    )
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "tangle/1",
    })
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn graph_handler(
    State(state): State<Arc<HttpState>>,
    body: Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let (status, body) = match body {
        Ok(body) => graph_inner(&state, &body).await,
        Err(rejection) => {
            tracing::warn!(status = %rejection.status(), "Request body rejected");
            (
                rejection.status(),
                serde_json::json!({ "error": rejection.body_text() }),
            )
        }
    };
    (status, Json(body))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state);
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
