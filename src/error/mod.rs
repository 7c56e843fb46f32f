// Error types for the gemini-chat gateway
// Author: kelexine (https://github.com/kelexine)

use crate::models::chat::ErrorBody;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Hint shown to callers when the upstream quota is exhausted and no wait
/// time is known.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again in ~5 minutes.";

/// Cause reported alongside [`RATE_LIMIT_MESSAGE`].
pub const RATE_LIMIT_DETAILS: &str =
    "The Gemini API free tier request quota has been exhausted for now.";

/// Message returned for bodies over `server.max_body_bytes`.
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Request body is too large";

/// Message returned for every upstream or internal failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Server error while generating a response";

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Upstream rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body. Only validation messages are echoed back; other
    /// variants get a message of our own and their detail stays in the logs.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            ProxyError::Validation(message) => ErrorBody::new(message.clone()),
            ProxyError::PayloadTooLarge => ErrorBody::new(PAYLOAD_TOO_LARGE_MESSAGE),
            ProxyError::RateLimited { retry_after } => {
                let seconds = retry_after.map(retry_seconds);
                let mut body =
                    ErrorBody::new(rate_limit_message(seconds)).with_details(RATE_LIMIT_DETAILS);
                body.retry_after_seconds = seconds;
                body
            }
            _ => ErrorBody::new(GENERIC_ERROR_MESSAGE),
        }
    }
}

/// Whole seconds to wait, never zero.
fn retry_seconds(delay: Duration) -> u64 {
    let secs = delay
        .as_secs()
        .saturating_add(u64::from(delay.subsec_nanos() > 0));
    secs.max(1)
}

/// Rate-limit text that agrees with `retryAfterSeconds`.
pub fn rate_limit_message(retry_after_seconds: Option<u64>) -> String {
    match retry_after_seconds {
        None => RATE_LIMIT_MESSAGE.to_string(),
        Some(secs) if secs < 60 => format!(
            "Rate limit exceeded. Please try again in ~{} second{}.",
            secs,
            if secs == 1 { "" } else { "s" }
        ),
        Some(secs) => {
            let minutes = secs.saturating_add(30) / 60;
            format!(
                "Rate limit exceeded. Please try again in ~{} minute{}.",
                minutes,
                if minutes == 1 { "" } else { "s" }
            )
        }
    }
}

// Convert ProxyError to HTTP responses for Axum
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, axum::Json(self.to_body())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
