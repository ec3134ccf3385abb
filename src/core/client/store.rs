//! In-memory payload store with lazy, read-time expiry.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::core::request::CacheKey;

#[derive(Debug)]
struct CacheEntry {
    payload: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

#[derive(Debug)]
pub(crate) struct CacheStore {
    map: RwLock<HashMap<CacheKey, CacheEntry>>,
    default_ttl: Duration,
}

impl CacheStore {
    pub(crate) fn new(default_ttl: Duration) -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub(crate) const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the payload only if it is still fresh at `now`. Stale entries stay in
    /// place until overwritten or invalidated.
    pub(crate) fn get(&self, key: &CacheKey, now: Instant) -> Option<Value> {
        let guard = self.map.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.payload.clone())
    }

    pub(crate) fn put(&self, key: CacheKey, payload: Value, now: Instant, ttl: Option<Duration>) {
        let entry = CacheEntry {
            payload,
            stored_at: now,
            ttl: ttl.unwrap_or(self.default_ttl),
        };
        let mut guard = self.map.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key, entry);
    }

    pub(crate) fn remove(&self, key: &CacheKey) -> bool {
        let mut guard = self.map.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(key).is_some()
    }

    pub(crate) fn clear(&self) {
        let mut guard = self.map.write().unwrap_or_else(PoisonError::into_inner);
        guard.clear();
    }

    /// Number of stored entries, stale ones included.
    pub(crate) fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
