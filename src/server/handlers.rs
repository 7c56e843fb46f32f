// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::error::ProxyError;
use crate::models::chat::{ChatRequest, ChatResponse};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

/// Liveness probe. Always 200 while the process is serving.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Server is running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Handler for the /api/chat endpoint
pub async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();

    let (response, outcome) = match read_body(body).and_then(|body| parse_chat_request(&body)) {
        Ok(req) => match state.dispatcher.dispatch(req).await {
            Ok(reply) => {
                let outcome = if reply.fallback {
                    "fallback"
                } else if reply.cached {
                    "cached"
                } else {
                    "generated"
                };
                (Json(ChatResponse::from(reply)).into_response(), outcome)
            }
            Err(e) => {
                let outcome = outcome_label(&e);
                (e.into_response(), outcome)
            }
        },
        Err(e) => (e.into_response(), "invalid"),
    };

    let status = response.status();
    info!(
        "Chat request finished: status={}, outcome={}, took={:?}",
        status.as_u16(),
        outcome,
        started.elapsed()
    );
    crate::metrics::record_request(
        "/api/chat",
        status.as_u16(),
        outcome,
        started.elapsed().as_secs_f64(),
    );

    response
}

/// Turn an extractor rejection (oversized or unreadable body) into the
/// standard error body instead of axum's plain-text one.
fn read_body(body: Result<Bytes, BytesRejection>) -> Result<Bytes, ProxyError> {
    body.map_err(|rejection| {
        debug!("Rejecting unreadable chat body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ProxyError::PayloadTooLarge
        } else {
            ProxyError::Validation("Request body could not be read".to_string())
        }
    })
}

/// Decode the body ourselves so malformed JSON gets the same error shape as
/// every other failure.
fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, ProxyError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!("Rejecting malformed chat body: {}", e);
        ProxyError::Validation(format!("Request body must be a JSON object: {}", e))
    })
}

fn outcome_label(error: &ProxyError) -> &'static str {
    match error {
        ProxyError::Validation(_) | ProxyError::PayloadTooLarge => "invalid",
        ProxyError::RateLimited { .. } => "rate_limited",
        _ => "failed",
    }
}

/// Diagnostic echo of whatever the client sent.
pub async fn test_handler(body: Result<Bytes, BytesRejection>) -> Response {
    let body = match read_body(body) {
        Ok(body) => body,
        Err(e) => return e.into_response(),
    };
    let received = serde_json::from_slice::<Value>(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
    Json(json!({
        "success": true,
        "message": "Test endpoint reached",
        "received": received,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
    .into_response()
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Prometheus scrape endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>gemini-chat</title>
    </head>
    <body>
        <h1>Server is running</h1>
        <p>Send <code>POST /api/chat</code> with <code>{"message": "..."}</code> to talk to Gemini.</p>
        <p>Health: <a href="/health">/health</a></p>
    </body>
</html>
"#;
