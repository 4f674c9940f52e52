//! In-memory fixed-window rate limiter
//!
//! Keys (usually `ip:<addr>`) are spread over several mutex-guarded shards to
//! keep lock contention low.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

const DEFAULT_SHARDS: usize = 16;
const MAX_BUCKETS_PER_SHARD: usize = 10_000;

#[derive(Debug, Clone)]
struct Bucket {
    count: u32,
    reset_at: Instant,
}

impl Bucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> bool {
        let now = Instant::now();
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            true
        } else {
            false
        }
    }
}

/// Outcome of an allowed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_in: Duration,
}

/// Sharded fixed-window rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, Bucket>>>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_shards(limit, window, DEFAULT_SHARDS)
    }

    pub fn with_shards(limit: u32, window: Duration, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            limit,
            window,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn shard_for(&self, key: &str) -> &Arc<Mutex<HashMap<String, Bucket>>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Count one request for `key`.
    ///
    /// Returns the remaining allowance, or the time until the window resets
    /// when the limit is already used up.
    pub async fn check(&self, key: &str) -> Result<RateLimitStatus, Duration> {
        let mut buckets = self.shard_for(key).lock().await;

        if buckets.len() >= MAX_BUCKETS_PER_SHARD && !buckets.contains_key(key) {
            let now = Instant::now();
            buckets.retain(|_, bucket| bucket.reset_at > now);

            if buckets.len() >= MAX_BUCKETS_PER_SHARD {
                let oldest = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    buckets.remove(&oldest);
                    tracing::debug!(evicted_key = %oldest, "Evicted oldest rate limit bucket");
                }
            }
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::new(self.window));

        let reset_in = |b: &Bucket| b.reset_at.saturating_duration_since(Instant::now());
        if bucket.check_and_increment(self.limit, self.window) {
            Ok(RateLimitStatus {
                limit: self.limit,
                remaining: self.limit.saturating_sub(bucket.count),
                reset_in: reset_in(bucket),
            })
        } else {
            Err(reset_in(bucket))
        }
    }

    /// Drop buckets whose window has passed
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut cleaned = 0;
        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before = buckets.len();
            buckets.retain(|_, bucket| bucket.reset_at > now);
            cleaned += before - buckets.len();
        }
        if cleaned > 0 {
            tracing::debug!(buckets_cleaned = cleaned, "Cleaned up expired rate limit buckets");
        }
        cleaned
    }
}
