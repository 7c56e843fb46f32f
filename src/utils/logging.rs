//! Structured logging and security-focused trace utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing utilities to prevent
//! sensitive data (like API keys) from leaking into logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{ProxyError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Google API keys: `AIza` followed by 35 URL-safe characters.
static API_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AIza[0-9A-Za-z_\-]{35}").expect("valid API key regex"));

/// `key=` query parameters, as they appear in echoed request URLs.
static KEY_PARAM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([?&]key=)[^&\s]+").expect("valid key param regex"));

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `compact`: Single-line human-readable output.
/// - `pretty` (default): Multi-line, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    // Configure filter from environment or config file
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ProxyError::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let initialized = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    initialized.map_err(|e| ProxyError::Internal(format!("Failed to install logger: {}", e)))
}

/// Sanitizes sensitive information from log messages.
///
/// Google API keys (`AIza...`) and `key=` URL parameters are replaced with
/// redaction markers. Upstream error bodies can echo the request URL, so
/// anything read back from Gemini goes through here before it is logged.
pub fn sanitize(input: &str) -> String {
    let result = API_KEY_PATTERN.replace_all(input, "[REDACTED_API_KEY]");
    KEY_PARAM_PATTERN
        .replace_all(&result, "${1}[REDACTED]")
        .into_owned()
}
