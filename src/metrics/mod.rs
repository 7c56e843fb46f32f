// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics, CACHE_ENTRIES, CACHE_OPERATIONS, GEMINI_API_CALLS, GEMINI_API_DURATION,
    REQUESTS_TOTAL, REQUEST_DURATION,
};

/// Helper to record request metrics
pub fn record_request(endpoint: &str, status_code: u16, outcome: &str, duration_secs: f64) {
    let status = status_code.to_string();
    REQUESTS_TOTAL
        .with_label_values(&[endpoint, &status, outcome])
        .inc();

    REQUEST_DURATION
        .with_label_values(&[endpoint, &status])
        .observe(duration_secs);
}

/// Helper to record Gemini API call metrics
pub fn record_gemini_call(backend: &str, result: &str, duration_secs: f64) {
    GEMINI_API_CALLS.with_label_values(&[backend, result]).inc();

    GEMINI_API_DURATION
        .with_label_values(&[backend])
        .observe(duration_secs);
}

/// Helper to record cache operations
pub fn record_cache_operation(operation: &str) {
    CACHE_OPERATIONS.with_label_values(&[operation]).inc();
}

pub fn record_cache_purge(count: usize) {
    CACHE_OPERATIONS
        .with_label_values(&["purged"])
        .inc_by(count as f64);
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.with_label_values(&["stored"]).set(count as f64);
}
