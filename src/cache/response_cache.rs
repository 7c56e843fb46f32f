// Response cache - prompt key to generated text, with per-entry TTL
// Author: kelexine (https://github.com/kelexine)

use crate::cache::key::PromptKey;
use crate::cache::models::{CacheStats, CachedResponse};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Deadline used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

struct Entry {
    record: CachedResponse,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory response cache.
///
/// Expiry is evaluated on every lookup against the entry's own deadline, so
/// re-inserting a key always extends its life and an old deadline can never
/// remove a newer answer. Expired entries stay in the map until
/// [`ResponseCache::purge_expired`] runs or the key is written again.
///
/// There is no size bound. Each distinct live prompt holds one entry.
#[derive(Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<PromptKey, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    inserts: AtomicU64,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live record for `key`, tagged `cached = true`.
    pub fn lookup(&self, key: &PromptKey) -> Option<CachedResponse> {
        let now = Instant::now();
        let entries = self.entries.read();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_cache_operation("hit");
                debug!("Cache hit: {}", key);
                Some(CachedResponse {
                    cached: true,
                    ..entry.record.clone()
                })
            }
            Some(_) => {
                self.expired.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_cache_operation("expired");
                debug!("Cache entry expired: {}", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_cache_operation("miss");
                debug!("Cache miss: {}", key);
                None
            }
        }
    }

    /// Store `record` under `key` until `ttl` has elapsed.
    pub fn insert(&self, key: PromptKey, record: CachedResponse, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        debug!("Caching response for {} (ttl {:?})", key, ttl);

        let len = {
            let mut entries = self.entries.write();
            entries.insert(key, Entry { record, expires_at });
            entries.len()
        };

        self.inserts.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_cache_operation("insert");
        crate::metrics::update_cache_entries(len);
    }

    /// Drop every entry whose TTL has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let (removed, len) = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            (before - entries.len(), entries.len())
        };

        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
            crate::metrics::record_cache_purge(removed);
        }
        crate::metrics::update_cache_entries(len);
        removed
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
        crate::metrics::update_cache_entries(0);
        debug!("Cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
        }
    }
}

/// Periodically purge expired entries from `cache`.
pub fn spawn_sweeper(cache: Arc<ResponseCache>, interval: Duration) -> JoinHandle<()> {
    info!("Cache sweep every {:?}", interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.purge_expired();
        }
    })
}
