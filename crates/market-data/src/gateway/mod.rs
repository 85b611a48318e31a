//! Resilient data fetch gateway.
//!
//! The gateway sits between consumers and the upstream sources:
//! - Fresh cache entries are served without touching the upstream
//! - Otherwise exactly one upstream call is made, validated and cached
//! - Failures are classified and resolved to a stale cache entry or a synthesized
//!   payload, with the classified error attached
//!
//! It never retries on its own; retries belong to the
//! [`RetryController`](crate::controller::RetryController), across successive calls.

mod rate_limiter;
mod validator;

pub use rate_limiter::RateLimiter;
pub use validator::{PayloadValidator, ValidationIssue, ValidationSeverity};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, info, warn};
use tokio::time::Instant;

use crate::cache::CacheStore;
use crate::errors::{ClassifiedError, MarketDataError};
use crate::models::{
    Envelope, FetchRequest, GatewayResponse, Provenance, Resource, ResourceData, ResourceFamily,
};
use crate::provider::UpstreamSource;
use crate::synth::FallbackSynthesizer;

/// Cache TTL per resource family.
#[derive(Clone, Debug, PartialEq)]
pub struct TtlPolicy {
    pub markets: Duration,
    pub coin: Duration,
    pub trending: Duration,
    pub historical: Duration,
    pub fear_greed: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            markets: Duration::from_secs(60),
            coin: Duration::from_secs(60),
            trending: Duration::from_secs(300),
            historical: Duration::from_secs(300),
            fear_greed: Duration::from_secs(3600),
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, family: ResourceFamily) -> Duration {
        match family {
            ResourceFamily::Markets => self.markets,
            ResourceFamily::Coin => self.coin,
            ResourceFamily::Trending => self.trending,
            ResourceFamily::Historical => self.historical,
            ResourceFamily::FearGreed => self.fear_greed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub ttl: TtlPolicy,
    /// Share one upstream call between concurrent misses on the same key.
    pub dedupe_in_flight: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ttl: TtlPolicy::default(),
            dedupe_in_flight: true,
        }
    }
}

type UpstreamResult = Result<Arc<ResourceData>, Arc<MarketDataError>>;
type SharedFetch = Shared<BoxFuture<'static, UpstreamResult>>;

/// Caching, classifying, fallback-synthesizing facade over upstream sources.
pub struct DataGateway {
    sources: Vec<Arc<dyn UpstreamSource>>,
    cache: Arc<dyn CacheStore>,
    synthesizer: Arc<dyn FallbackSynthesizer>,
    validator: PayloadValidator,
    rate_limiter: Arc<RateLimiter>,
    config: GatewayConfig,
    in_flight: Mutex<HashMap<String, SharedFetch>>,
}

impl DataGateway {
    /// Create a gateway with default configuration.
    ///
    /// Sources are tried in order; the first one that supports a resource serves it.
    pub fn new(
        sources: Vec<Arc<dyn UpstreamSource>>,
        cache: Arc<dyn CacheStore>,
        synthesizer: Arc<dyn FallbackSynthesizer>,
    ) -> Self {
        Self::with_config(sources, cache, synthesizer, GatewayConfig::default())
    }

    pub fn with_config(
        sources: Vec<Arc<dyn UpstreamSource>>,
        cache: Arc<dyn CacheStore>,
        synthesizer: Arc<dyn FallbackSynthesizer>,
        config: GatewayConfig,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new());
        for source in &sources {
            rate_limiter.configure(source.id(), source.rate_limit());
        }

        Self {
            sources,
            cache,
            synthesizer,
            validator: PayloadValidator::new(),
            rate_limiter,
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Shorthand for fetching a resource with default request options.
    pub async fn fetch_resource(
        &self,
        resource: Resource,
    ) -> Result<GatewayResponse, ClassifiedError> {
        self.fetch(&FetchRequest::new(resource)).await
    }

    /// Resolve a request to live, cached or synthetic data.
    ///
    /// Classifiable failures never surface as `Err`: they are attached to the
    /// returned envelope. `Err` means the synthesizer itself failed.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<GatewayResponse, ClassifiedError> {
        let key = request.cache_key();

        if let Some(entry) = self.cache.get_stale_ok(&key) {
            if entry.is_fresh_within(Instant::now(), request.staleness_budget) {
                debug!("Cache hit for '{}'", key);
                return Ok(Envelope::new(entry.payload, Provenance::Cached, entry.stored_at));
            }
        }

        match self.fetch_upstream(request, &key).await {
            Ok(payload) => {
                info!("Fetched '{}' from upstream", key);
                Ok(Envelope::new(payload, Provenance::Live, Utc::now()))
            }
            Err(cause) => {
                let error = ClassifiedError::classify_shared(cause, request.attempt);
                warn!(
                    "Upstream fetch for '{}' failed: kind={} status={:?} attempt={}: {}",
                    key,
                    error.kind(),
                    error.http_status(),
                    error.attempt(),
                    error.cause()
                );
                self.fallback(request, &key, error)
            }
        }
    }

    /// Drop cache entries older than their TTL plus `grace`.
    pub fn evict_expired(&self, grace: Duration) -> usize {
        self.cache.evict_expired(grace)
    }

    fn fallback(
        &self,
        request: &FetchRequest,
        key: &str,
        error: ClassifiedError,
    ) -> Result<GatewayResponse, ClassifiedError> {
        if let Some(entry) = self.cache.get_stale_ok(key) {
            debug!("Serving stale cache for '{}'", key);
            let envelope = Envelope::new(entry.payload, Provenance::Cached, entry.stored_at);
            return Ok(envelope.degraded_by(error));
        }

        match self.synthesizer.synthesize(&request.resource, &request.params) {
            Ok(data) => {
                debug!("Serving synthetic {} for '{}'", data.kind_name(), key);
                let envelope = Envelope::new(Arc::new(data), Provenance::Synthetic, Utc::now());
                Ok(envelope.degraded_by(error))
            }
            Err(e) => {
                error!("Fallback synthesis for '{}' failed: {}", key, e);
                Err(ClassifiedError::classify(e, request.attempt))
            }
        }
    }

    fn source_for(&self, resource: &Resource) -> Option<Arc<dyn UpstreamSource>> {
        self.sources
            .iter()
            .find(|source| source.supports(resource))
            .cloned()
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, SharedFetch>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| {
            warn!("In-flight mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    async fn fetch_upstream(&self, request: &FetchRequest, key: &str) -> UpstreamResult {
        let source = self
            .source_for(&request.resource)
            .ok_or_else(|| Arc::new(MarketDataError::Unsupported(request.resource.key())))?;

        let call = self.upstream_call(source, request, key);
        if !self.config.dedupe_in_flight {
            return call.await;
        }

        let shared = {
            let mut in_flight = self.lock_in_flight();
            match in_flight.get(key) {
                Some(existing) => {
                    debug!("Joining in-flight fetch for '{}'", key);
                    existing.clone()
                }
                None => {
                    let shared = call.shared();
                    in_flight.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;

        let mut in_flight = self.lock_in_flight();
        if in_flight.get(key).is_some_and(|current| current.ptr_eq(&shared)) {
            in_flight.remove(key);
        }
        result
    }

    /// One rate-limited, validated upstream call that caches on success.
    fn upstream_call(
        &self,
        source: Arc<dyn UpstreamSource>,
        request: &FetchRequest,
        key: &str,
    ) -> BoxFuture<'static, UpstreamResult> {
        let cache = Arc::clone(&self.cache);
        let rate_limiter = Arc::clone(&self.rate_limiter);
        let validator = self.validator.clone();
        let ttl = self.config.ttl.ttl_for(request.resource.family());
        let resource = request.resource.clone();
        let params = request.params.clone();
        let key = key.to_string();

        async move {
            if !rate_limiter.try_acquire(source.id()) {
                return Err(Arc::new(MarketDataError::Throttled {
                    provider: source.id().to_string(),
                }));
            }

            let data = source.fetch(&resource, &params).await.map_err(Arc::new)?;
            validator.validate(source.id(), &data).map_err(Arc::new)?;

            let payload = Arc::new(data);
            cache.put(&key, Arc::clone(&payload), ttl);
            Ok(payload)
        }
        .boxed()
    }
}
