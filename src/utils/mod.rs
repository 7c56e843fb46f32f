//! Utility functions and helpers for the gemini-chat gateway.
//!
//! This module provides cross-cutting concerns like structured logging,
//! API key sanitization, and upstream retry hint parsing.
//!
//! # Submodules
//!
//! - `logging`: Tracing and logging initialization with security filters.
//! - `retry`: Extraction of Google `RetryInfo` hints from error bodies.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
pub mod retry;
