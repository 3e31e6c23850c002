//! Rendered-response store with a revalidation window.

use std::{
    sync::RwLock,
    time::{Duration, Instant},
};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::{
    CacheConfig,
    lock::{rw_read, rw_write},
};

const SOURCE: &str = "cache::store";

pub const METRIC_CACHE_HIT: &str = "spacetraveling_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "spacetraveling_cache_miss_total";
pub const METRIC_CACHE_EVICT: &str = "spacetraveling_cache_evict_total";

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub rendered_at: Instant,
}

impl CachedResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            rendered_at: Instant::now(),
        }
    }

    fn is_fresh_at(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.rendered_at) < window
    }
}

/// LRU of rendered pages keyed by path and query.
///
/// Entries older than the revalidation window are dropped on lookup, so the
/// next request renders the page again from the content source.
pub struct ResponseStore {
    responses: RwLock<LruCache<String, CachedResponse>>,
    window: Duration,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: RwLock::new(LruCache::new(config.max_entries_non_zero())),
            window: config.revalidate_after(),
        }
    }

    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<CachedResponse> {
        let mut responses = rw_write(&self.responses, SOURCE, "get");
        let lookup = responses
            .get(key)
            .map(|cached| cached.is_fresh_at(now, self.window).then(|| cached.clone()));
        let fresh = match lookup {
            Some(Some(cached)) => Some(cached),
            Some(None) => {
                responses.pop(key);
                None
            }
            None => None,
        };

        if fresh.is_some() {
            counter!(METRIC_CACHE_HIT).increment(1);
        } else {
            counter!(METRIC_CACHE_MISS).increment(1);
        }
        fresh
    }

    /// Store a response, returning the key pushed out to make room, if any.
    pub fn set(&self, key: String, response: CachedResponse) -> Option<String> {
        let evicted = rw_write(&self.responses, SOURCE, "set")
            .push(key.clone(), response)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key);
        if evicted.is_some() {
            counter!(METRIC_CACHE_EVICT).increment(1);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
