//! Configuration data structures for the gemini-chat gateway.
//!
//! This module defines the schema for the application settings: server
//! parameters, the upstream Gemini connection, response caching, dispatch
//! policy, logging and performance tuning.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, workers).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Request dispatch policy (timeouts, retry hints, fallbacks).
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Performance and resource management settings.
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `0.0.0.0` so devices on the local network can connect.
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `3000`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads for the Tokio runtime.
    /// Default: Number of logical CPU cores.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Largest accepted request body in bytes.
    /// Default: `1048576` (1 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Gemini API key. Wiped from memory on drop and never printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

// Custom Debug impl that never logs the key
impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Settings for the upstream Gemini API connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key for the Generative Language API. Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKey>,

    /// Base URL for the Generative Language REST API.
    /// Default: `https://generativelanguage.googleapis.com/v1beta`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// The Gemini model every request is sent to.
    /// Default: `gemini-2.0-flash`
    #[serde(default = "default_model")]
    pub model: String,

    /// System instruction used when the client does not send one.
    #[serde(default = "default_system_instruction")]
    pub default_system_instruction: String,

    /// HTTP client request timeout in seconds.
    /// Default: `30`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// TCP connect timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// Settings for the in-memory response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether answers are cached at all.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lifetime of a cached answer in seconds.
    /// Default: `3600` (1 hour)
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// Interval of the background sweep that drops expired entries.
    /// `0` disables the sweep. Default: `300`
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,

    /// Include the system instruction and generation parameters in the
    /// cache key. Default: `false` (key on message text only)
    #[serde(default)]
    pub scope_by_instruction: bool,

    /// Share one upstream call between concurrent requests for the same key.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub coalesce_requests: bool,
}

/// Settings for how the dispatcher treats upstream calls and failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Deadline for a single upstream generation in seconds.
    /// Default: `30`
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Retry hint sent with rate-limit responses when upstream gives none.
    /// Default: `300` (5 minutes)
    #[serde(default = "default_retry_hint")]
    pub retry_hint_seconds: u64,

    /// Answer with `fallback_message` instead of an error when the upstream
    /// call fails for any reason other than rate limiting.
    /// Default: `false`
    #[serde(default)]
    pub fallback_enabled: bool,

    /// Canned answer used when `fallback_enabled` is set.
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Settings for tuning application performance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum number of idle connections to keep in the HTTP pool.
    /// Default: `10`
    #[serde(default = "default_pool_size")]
    pub connection_pool_size: usize,

    /// Whether to enable GZIP compression for HTTP responses.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enable_compression: bool,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_seconds > 0).then(|| Duration::from_secs(self.sweep_interval_seconds))
    }
}

impl DispatchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn retry_hint(&self) -> Duration {
        Duration::from_secs(self.retry_hint_seconds)
    }
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_api_base_url(),
            model: default_model(),
            default_system_instruction: default_system_instruction(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
            scope_by_instruction: false,
            coalesce_requests: true,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            retry_hint_seconds: default_retry_hint(),
            fallback_enabled: false,
            fallback_message: default_fallback_message(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            connection_pool_size: default_pool_size(),
            enable_compression: true,
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_system_instruction() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

fn default_retry_hint() -> u64 {
    300 // 5 minutes
}

fn default_fallback_message() -> String {
    "Sorry, I can't answer right now. Please try again a little later.".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_pool_size() -> usize {
    10
}
