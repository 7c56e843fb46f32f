//! Axum-based HTTP server implementation for the gemini-chat gateway.
//!
//! This module is responsible for setting up the HTTP server, configuring routes,
//! and handling incoming chat requests. Each chat request is handed to the
//! [`Dispatcher`](crate::dispatch::Dispatcher), which answers from the
//! response cache or the Gemini API.
//!
//! # Components
//!
//! - `handlers`: Implementation of individual endpoints (chat, health, metrics, echo).
//! - `middleware`: Request ID tracking and CORS.
//! - `routes`: The main router configuration that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::HealthResponse;
pub use routes::{create_router, AppState};
