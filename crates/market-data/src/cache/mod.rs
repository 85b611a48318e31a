//! Ephemeral payload cache.
//!
//! The gateway only talks to the [`CacheStore`] trait so a shared external store can
//! replace [`EphemeralCache`] in multi-instance deployments.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::time::Instant;

use crate::models::ResourceData;

/// Default bound on the number of cached keys.
pub const DEFAULT_MAX_ENTRIES: usize = 512;

/// A cached payload. Replaced as a whole on every `put`.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Arc<ResourceData>,
    /// Monotonic fetch time, used for freshness.
    pub fetched_at: Instant,
    /// Wall-clock fetch time, reported to clients.
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, payload: Arc<ResourceData>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            payload,
            fetched_at: Instant::now(),
            stored_at: Utc::now(),
            ttl,
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }

    /// `now - fetched_at < ttl`
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.age(now) < self.ttl
    }

    /// Freshness against a caller-supplied budget instead of the entry's TTL.
    pub fn is_fresh_within(&self, now: Instant, budget: Option<Duration>) -> bool {
        self.age(now) < budget.unwrap_or(self.ttl)
    }
}

/// Key to payload store used by the gateway.
///
/// Concurrent `put`s for one key are last-write-wins.
pub trait CacheStore: Send + Sync {
    /// The entry for `key` if it is still fresh.
    fn get(&self, key: &str) -> Option<CacheEntry>;

    /// The entry for `key` regardless of age.
    fn get_stale_ok(&self, key: &str) -> Option<CacheEntry>;

    fn put(&self, key: &str, payload: Arc<ResourceData>, ttl: Duration);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries older than `ttl + grace`. Returns how many were removed.
    fn evict_expired(&self, grace: Duration) -> usize;
}

/// In-process [`CacheStore`] bounded by entry count.
///
/// When full, inserting a new key evicts the entry with the oldest fetch time.
pub struct EphemeralCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl EphemeralCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for EphemeralCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for EphemeralCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.lock_entries();
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .cloned()
    }

    fn get_stale_ok(&self, key: &str) -> Option<CacheEntry> {
        self.lock_entries().get(key).cloned()
    }

    fn put(&self, key: &str, payload: Arc<ResourceData>, ttl: Duration) {
        let mut entries = self.lock_entries();

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            let oldest = entries
                .values()
                .min_by_key(|entry| entry.fetched_at)
                .map(|entry| entry.key.clone());
            if let Some(oldest) = oldest {
                debug!("Cache full ({} entries), evicting '{}'", entries.len(), oldest);
                entries.remove(&oldest);
            }
        }

        entries.insert(key.to_string(), CacheEntry::new(key, payload, ttl));
    }

    fn len(&self) -> usize {
        self.lock_entries().len()
    }

    fn evict_expired(&self, grace: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.age(now) < entry.ttl.saturating_add(grace));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Evicted {} expired cache entries", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FearGreedEntry, PricePoint};

    fn payload(price: f64) -> Arc<ResourceData> {
        Arc::new(ResourceData::Historical(vec![PricePoint::new(0, price)]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_within_ttl() {
        let cache = EphemeralCache::new();
        let value = payload(42.0);
        cache.put("historical:bitcoin:60", value.clone(), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(59)).await;

        let entry = cache.get("historical:bitcoin:60").unwrap();
        assert!(Arc::ptr_eq(&entry.payload, &value));
        // Reading does not mutate
        let again = cache.get("historical:bitcoin:60").unwrap();
        assert_eq!(again.payload, value);
        assert_eq!(again.fetched_at, entry.fetched_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_still_available_for_fallback() {
        let cache = EphemeralCache::new();
        let value = payload(1.0);
        cache.put("k", value.clone(), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(60)).await;

        assert!(cache.get("k").is_none());
        let stale = cache.get_stale_ok("k").unwrap();
        assert!(!stale.is_fresh(Instant::now()));
        assert_eq!(stale.payload, value);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_replaces_whole_entry() {
        let cache = EphemeralCache::new();
        cache.put("k", payload(1.0), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.put(
            "k",
            Arc::new(ResourceData::FearGreed(vec![FearGreedEntry {
                value: 50,
                classification: "Neutral".into(),
                timestamp: 0,
            }])),
            Duration::from_secs(20),
        );

        let entry = cache.get("k").unwrap();
        assert_eq!(entry.ttl, Duration::from_secs(20));
        assert!(entry.payload.as_fear_greed().is_some());
        assert_eq!(entry.age(Instant::now()), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_evicts_oldest() {
        let cache = EphemeralCache::with_capacity(2);
        cache.put("a", payload(1.0), Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put("b", payload(2.0), Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put("c", payload(3.0), Duration::from_secs(60));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_stale_ok("a").is_none());
        assert!(cache.get_stale_ok("b").is_some());
        assert!(cache.get_stale_ok("c").is_some());

        // Overwriting an existing key never evicts
        cache.put("b", payload(4.0), Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired_respects_grace() {
        let cache = EphemeralCache::new();
        cache.put("short", payload(1.0), Duration::from_secs(10));
        cache.put("long", payload(2.0), Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(cache.evict_expired(Duration::from_secs(10)), 0);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.evict_expired(Duration::from_secs(10)), 1);
        assert!(cache.get_stale_ok("short").is_none());
        assert!(cache.get("long").is_some());
    }
}
