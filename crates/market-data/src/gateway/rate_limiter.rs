//! Token bucket rate limiter for upstream sources.
//!
//! Each source gets its own bucket, sized from the source's [`RateLimit`].
//! The gateway never waits for a token: an empty bucket is reported as a local
//! rate-limit failure and resolved through the fallback chain.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::provider::RateLimit;

/// Token bucket for a single source.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of available tokens.
    tokens: f64,
    /// Last time the bucket was updated.
    last_update: Instant,
    /// Token refill rate (tokens per second).
    rate: f64,
    /// Maximum bucket capacity.
    capacity: f64,
}

impl TokenBucket {
    fn with_limit(limit: &RateLimit) -> Self {
        let capacity = limit.burst_capacity.max(1.0);
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: f64::from(limit.requests_per_minute) / 60.0,
            capacity,
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until the next token is available.
    fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 || self.rate <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.rate)
        }
    }
}

/// Thread-safe rate limiter holding one bucket per source id.
///
/// Buckets are created on first use from the configured limit, or
/// [`RateLimit::default`] when the source was never configured.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    configs: Mutex<HashMap<String, RateLimit>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            configs: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the buckets mutex, recovering from poison if necessary.
    fn lock_buckets(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter buckets mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_configs(&self) -> MutexGuard<'_, HashMap<String, RateLimit>> {
        self.configs.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter configs mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Set the limit for a source, resetting its bucket.
    pub fn configure(&self, source: &str, limit: RateLimit) {
        let mut configs = self.lock_configs();
        configs.insert(source.to_string(), limit);
        drop(configs); // Release configs lock before acquiring buckets lock

        self.lock_buckets().remove(source);
    }

    /// Take a token for `source` if one is available.
    pub fn try_acquire(&self, source: &str) -> bool {
        let bucket_limit = self.limit_for(source);
        let mut buckets = self.lock_buckets();
        let bucket = buckets
            .entry(source.to_string())
            .or_insert_with(|| TokenBucket::with_limit(&bucket_limit));

        let acquired = bucket.try_acquire();
        if !acquired {
            debug!(
                "Rate limiter: no token for '{}', next in {:?}",
                source,
                bucket.time_until_available()
            );
        }
        acquired
    }

    #[cfg(test)]
    fn remaining_tokens(&self, source: &str) -> f64 {
        let mut buckets = self.lock_buckets();
        match buckets.get_mut(source) {
            Some(bucket) => {
                bucket.refill();
                bucket.tokens
            }
            None => self.limit_for(source).burst_capacity.max(1.0),
        }
    }

    fn limit_for(&self, source: &str) -> RateLimit {
        self.lock_configs().get(source).cloned().unwrap_or_default()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
