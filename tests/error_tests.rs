// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use gemini_chat::error::{ProxyError, GENERIC_ERROR_MESSAGE, RATE_LIMIT_MESSAGE};
use serde_json::Value;
use std::time::Duration;

async fn render(error: ProxyError) -> (StatusCode, Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_error_display_messages() {
    let errors = vec![
        ProxyError::Validation("Message is required".to_string()),
        ProxyError::RateLimited { retry_after: None },
        ProxyError::BackendUnavailable("connection reset".to_string()),
        ProxyError::Config("missing key".to_string()),
        ProxyError::Internal("task panicked".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[tokio::test]
async fn test_validation_message_is_echoed() {
    let (status, body) = render(ProxyError::Validation("Message is required".to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Message is required");
}

#[tokio::test]
async fn test_rate_limit_body() {
    let (status, body) = render(ProxyError::RateLimited {
        retry_after: Some(Duration::from_secs(300)),
    })
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], RATE_LIMIT_MESSAGE);
    assert_eq!(body["retryAfterSeconds"], 300);
}

#[tokio::test]
async fn test_internal_details_stay_private() {
    for error in [
        ProxyError::BackendUnavailable("HTTP 503 from 10.1.2.3".to_string()),
        ProxyError::Internal("leader task panicked".to_string()),
        ProxyError::Config("bad path /etc/secret".to_string()),
    ] {
        let (status, body) = render(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], GENERIC_ERROR_MESSAGE);
        assert!(body.get("details").is_none());
    }
}
