// Retry hint parsing for Google RPC error bodies
// Author: kelexine (https://github.com/kelexine)
//
// The gateway never retries on its own; it only forwards the upstream
// hint to the caller with the rate-limit response.

use serde_json::Value;
use std::time::Duration;

/// Upper bound on a forwarded retry hint.
const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// Parse Google's retryDelay duration string from an error body
/// (e.g., "0.457639761s", "40s").
pub fn parse_retry_delay(error_json: &str) -> Option<Duration> {
    let parsed: Value = serde_json::from_str(error_json).ok()?;

    // Navigate: error.details[] -> find RetryInfo -> retryDelay
    let details = parsed.get("error")?.get("details")?.as_array()?;

    details
        .iter()
        .filter(|detail| {
            detail.get("@type").and_then(Value::as_str)
                == Some("type.googleapis.com/google.rpc.RetryInfo")
        })
        .find_map(|detail| detail.get("retryDelay")?.as_str())
        .and_then(parse_duration_string)
}

/// Parse duration strings like "0.457639761s", "40s", "1.5s"
fn parse_duration_string(duration_str: &str) -> Option<Duration> {
    let seconds: f64 = duration_str.strip_suffix('s')?.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    let millis = (seconds.min(MAX_RETRY_DELAY_SECS) * 1000.0) as u64;
    Some(Duration::from_millis(millis))
}
