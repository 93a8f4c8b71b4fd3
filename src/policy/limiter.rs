//! Sharded token-bucket rate limiter keyed by "tenant:route".
//!
//! Buckets start full and refill continuously at `refill_per_sec`, capped at
//! `capacity`. A denied request spends nothing. State is per-process and
//! in-memory; buckets are created lazily on first sight of a key.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

const SHARDS: usize = 16;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    refill_per_sec: f64,
    capacity: f64,
    shards: [Mutex<HashMap<String, Bucket>>; SHARDS],
}

impl RateLimiter {
    pub fn new(refill_per_sec: f64, capacity: u32) -> Self {
        Self {
            refill_per_sec,
            capacity: f64::from(capacity),
            shards: std::array::from_fn(|_| Mutex::new(HashMap::new())),
        }
    }

    /// Try to take `cost` tokens from the bucket for `key`. Returns whether
    /// the request is admitted; on denial the bucket is left untouched (the
    /// refill still applies).
    pub fn allow(&self, key: &str, cost: f64) -> bool {
        let now = Instant::now();
        let mut shard = self.shards[self.shard_index(key)]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let bucket = shard.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            true
        } else {
            false
        }
    }

    fn shard_index(&self, key: &str) -> usize {
        // FNV-1a over the key bytes, folded into the shard count.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in key.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (hash as usize) % SHARDS
    }
}
