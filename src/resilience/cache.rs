//! Response cache keyed by `hash(normalized query, entity filters)`.
//!
//! Entries expire after the configured TTL; past capacity the least-recently-used entry is
//! evicted.

use std::time::Duration;

use moka::sync::Cache;

use crate::hashing::hash_query_key;
use crate::response::ChatResponse;

/// In-memory response cache.
pub struct ResponseCache {
    entries: Cache<[u8; 32], ChatResponse>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Key for a normalized query under `entity_filters`.
    #[inline]
    pub fn key<S: AsRef<str>>(normalized: &str, entity_filters: &[S]) -> [u8; 32] {
        hash_query_key(normalized, entity_filters)
    }

    /// Stored response for `key`, exactly as inserted.
    #[inline]
    pub fn get(&self, key: &[u8; 32]) -> Option<ChatResponse> {
        self.entries.get(key)
    }

    #[inline]
    pub fn insert(&self, key: [u8; 32], response: ChatResponse) {
        self.entries.insert(key, response);
    }

    #[inline]
    pub fn remove(&self, key: &[u8; 32]) -> Option<ChatResponse> {
        self.entries.remove(key)
    }

    #[inline]
    pub fn contains(&self, key: &[u8; 32]) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of cached entries (approximate until pending tasks run).
    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    #[inline]
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Runs any pending maintenance tasks in the underlying cache.
    #[inline]
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
