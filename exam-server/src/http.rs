//! Exam Builder HTTP API
//!
//! Axum server exposing the chat assistant, answer evaluation and event log.
//! Each endpoint is a thin axum handler over a pure `*_inner` function that
//! takes the services directly, so the logic is testable without the axum
//! dispatch machinery.
//!
//! Endpoints:
//! - GET  /health: storage health
//! - GET  /version: server version info
//! - POST /api/chat: one dialogue turn `{userId, message}`
//! - POST /api/ai-completion: evaluate an answer `{prompt: {...}}`
//! - POST /api/log-event: record a user intent `{userId?, intent, params?}`

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use exam_core::models::ScoringInput;
use exam_core::protocol::{ExamRequest, ExamResponse, PROTOCOL_VERSION};
use exam_core::ExamConfig;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::services::AppServices;
use crate::subsystems::chat::FALLBACK_REPLY;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub services: Arc<AppServices>,
    pub config: ExamConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/ai-completion", post(evaluate_handler))
        .route("/api/log-event", post(log_event_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    services: Arc<AppServices>,
    config: ExamConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(HttpState { services, config });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Exam Builder HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EvaluateRequest {
    /// Kept as raw JSON so a malformed prompt is reported as a 400 with a
    /// readable message instead of an extractor rejection.
    pub prompt: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogEventRequest {
    pub user_id: Option<String>,
    pub intent: Option<String>,
    pub params: Option<serde_json::Value>,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }

    fn into_value(self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error,
            "status": self.status,
        })
    }
}

/// Client-facing error for a failed chat turn; details stay in the logs.
pub const CHAT_FAILURE_ERROR: &str = "Failed to process chat message";

fn bad_request(msg: impl Into<String>) -> (StatusCode, serde_json::Value) {
    (StatusCode::BAD_REQUEST, ErrorResponse::new(msg).into_value())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check: returns 503 when the conversation store is down.
pub async fn health_inner(services: &AppServices) -> (StatusCode, serde_json::Value) {
    let response = crate::router::handle_request(ExamRequest::Health, services).await;
    match response_to_http(response) {
        Ok(mut data) => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert(
                    "version".to_string(),
                    serde_json::json!(env!("CARGO_PKG_VERSION")),
                );
            }
            (StatusCode::OK, data)
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e,
            }),
        ),
    }
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": PROTOCOL_VERSION,
    })
}

/// Inner chat: validates the fields and runs one dialogue turn. A storage
/// failure still carries a `reply` for the user.
pub async fn chat_inner(services: &AppServices, req: ChatRequest) -> (StatusCode, serde_json::Value) {
    let (user_id, message) = match (non_blank(req.user_id), req.message) {
        (Some(u), Some(m)) => (u, m),
        _ => return bad_request("userId and message are required"),
    };

    let response = crate::router::handle_request(
        ExamRequest::Chat { user_id, message },
        services,
    )
    .await;

    // the router already logged the underlying store error
    match response_to_http(response) {
        Ok(data) => (StatusCode::OK, data),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": CHAT_FAILURE_ERROR,
                "status": "error",
                "reply": FALLBACK_REPLY,
            }),
        ),
    }
}

/// Inner evaluate: parses the prompt and runs the cache-through scorer.
pub async fn evaluate_inner(
    services: &AppServices,
    req: EvaluateRequest,
) -> (StatusCode, serde_json::Value) {
    let prompt = match req.prompt {
        Some(p) if !p.is_null() => p,
        _ => return bad_request("prompt field is required"),
    };
    let prompt: ScoringInput = match serde_json::from_value(prompt) {
        Ok(p) => p,
        Err(e) => return bad_request(format!("invalid prompt: {}", e)),
    };

    let start = Instant::now();
    let response = crate::router::handle_request(ExamRequest::Evaluate { prompt }, services).await;
    let took_ms = start.elapsed().as_millis() as u64;

    match response_to_http(response) {
        Ok(mut data) => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert("tookMs".to_string(), serde_json::json!(took_ms));
            }
            (StatusCode::OK, data)
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(e).into_value(),
        ),
    }
}

/// Inner log-event: requires an intent; user id falls back to `anonymous`.
pub async fn log_event_inner(
    services: &AppServices,
    req: LogEventRequest,
) -> (StatusCode, serde_json::Value) {
    let intent = match non_blank(req.intent) {
        Some(i) => i,
        None => return bad_request("intent field is required"),
    };

    let request = ExamRequest::LogEvent {
        user_id: req.user_id,
        intent,
        params: req.params.unwrap_or_else(|| serde_json::json!({})),
    };
    let response = crate::router::handle_request(request, services).await;

    match response_to_http(response) {
        Ok(data) => (StatusCode::CREATED, data),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(e).into_value(),
        ),
    }
}

// ============================================================================
// Axum handler wrappers (delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.services).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn chat_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let (status, body) = chat_inner(&state.services, req).await;
    (status, Json(body))
}

pub async fn evaluate_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<EvaluateRequest>,
) -> impl IntoResponse {
    let (status, body) = evaluate_inner(&state.services, req).await;
    (status, Json(body))
}

pub async fn log_event_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<LogEventRequest>,
) -> impl IntoResponse {
    let (status, body) = log_event_inner(&state.services, req).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Convert an `ExamResponse` envelope into an HTTP body value, or an error string.
pub fn response_to_http(response: ExamResponse) -> std::result::Result<serde_json::Value, String> {
    if response.status == "ok" {
        Ok(response.data.unwrap_or(serde_json::json!({})))
    } else {
        Err(response.error.unwrap_or_else(|| "unknown error".to_string()))
    }
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
