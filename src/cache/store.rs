//! TTL response cache.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::http::ApiResponse;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: ApiResponse,
    expires_at: Instant,
}

/// Thread-safe store of successful read responses keyed by cache key.
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<DashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Fresh entry for `key`, if any. An expired entry is removed on the spot.
    pub fn get(&self, key: &str) -> Option<ApiResponse> {
        let now = Instant::now();
        match self.inner.get(key) {
            Some(entry) if now < entry.expires_at => return Some(entry.data.clone()),
            Some(_) => {}
            None => return None,
        }

        // The read guard is released before taking the shard write lock.
        self.inner.remove_if(key, |_, entry| now >= entry.expires_at);
        None
    }

    pub fn set(&self, key: impl Into<String>, data: ApiResponse) {
        self.set_with_ttl(key, data, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, data: ApiResponse, ttl: Duration) {
        self.inner.insert(
            key.into(),
            CacheEntry {
                data,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.inner.len())
    }

    /// Stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
