// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    chat_handler, health_handler, index_handler, metrics_handler, test_handler,
};
use super::middleware::{cors_layer, request_id_layers};
use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

pub fn create_router(config: &AppConfig, dispatcher: Dispatcher) -> Router {
    let max_body_bytes = config.server.max_body_bytes;
    let enable_compression = config.performance.enable_compression;

    let state = AppState { dispatcher };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/test", post(test_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    if enable_compression {
        app.layer(CompressionLayer::new())
    } else {
        app
    }
}
