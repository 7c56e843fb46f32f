//! Cache record and statistics models.

// Author: kelexine (https://github.com/kelexine)

use tokio::time::Instant;

/// A generated answer held by the response cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Generated text.
    pub text: String,
    /// True when this copy was read back from the cache.
    pub cached: bool,
    /// When the answer was generated.
    pub inserted_at: Instant,
}

impl CachedResponse {
    /// Record for text that was just generated.
    pub fn fresh(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cached: false,
            inserted_at: Instant::now(),
        }
    }
}

/// Counters for cache operations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a live entry.
    pub hits: u64,
    /// Lookups with no entry.
    pub misses: u64,
    /// Lookups that found an entry past its TTL.
    pub expired: u64,
    /// Entries written.
    pub inserts: u64,
}
