//! In-memory TTL response cache with bounded size.
//!
//! Expiry is lazy: `get` drops an expired entry when it trips over one, and
//! never evicts live entries. Capacity is enforced on write: when an insert
//! pushes the map past `max_items`, the single entry with the soonest expiry
//! is evicted.

pub mod key;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::providers::types::ChatCompletionResponse;

pub use key::fingerprint;

struct CacheEntry {
    value: ChatCompletionResponse,
    expires_at: Instant,
}

pub struct ResponseCache {
    ttl: Duration,
    max_items: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_items: usize) -> Self {
        Self {
            ttl,
            max_items,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a fingerprint. An expired entry is removed and reported as a
    /// miss; a live hit is cloned out.
    pub fn get(&self, key: &str) -> Option<ChatCompletionResponse> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a response under `key`, then evict the soonest-expiring entry
    /// if the insert pushed the cache past its size bound.
    pub fn set(&self, key: String, value: ChatCompletionResponse) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
        if entries.len() > self.max_items {
            if let Some(victim) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&victim);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
