//! CoinLens Market Data Crate
//!
//! Resilient access to cryptocurrency market data for the CoinLens dashboard.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Typed upstream resources (market listings, coin detail, trending, price history, Fear & Greed)
//! - Upstream adapters for CoinGecko and alternative.me
//! - A fixed error taxonomy with exponential backoff guidance
//! - A TTL cache with stale fallback and synthetic substitutes
//! - A retry controller that drives repeated loads for the presentation layer
//!
//! # Architecture
//!
//! ```text
//!                          +------------------+
//!                          | RetryController  |  (state machine, backoff timers)
//!                          +------------------+
//!                                  |
//!                                  v
//! +------------------+     +------------------+     +------------------+
//! |  EphemeralCache  | <-- |   DataGateway    | --> |   Synthesizer    |
//! +------------------+     +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  UpstreamSource  |  (CoinGecko, Fear & Greed)
//!                          +------------------+
//! ```
//!
//! Every [`DataGateway::fetch`] resolves to an [`Envelope`] tagged with its
//! [`Provenance`]. Failures are attached as a [`ClassifiedError`] instead of
//! being raised, so consumers always have something to render.
//!
//! # Example
//!
//! ```
//! use coinlens_market_data::{ErrorKind, Resource};
//!
//! let resource = Resource::parse("historical:bitcoin:60").unwrap();
//! assert_eq!(resource, Resource::historical("bitcoin", 60));
//! assert!(ErrorKind::RateLimit.is_transient());
//! ```

pub mod cache;
pub mod controller;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod provider;
pub mod synth;

#[cfg(test)]
mod testing;

pub use cache::{CacheEntry, CacheStore, EphemeralCache, DEFAULT_MAX_ENTRIES};
pub use controller::{
    ControllerSnapshot, ControllerState, GatewayLoader, Loader, RetryController, Transition,
};
pub use errors::{BackoffPolicy, ClassifiedError, ErrorKind, MarketDataError, RetryState};
pub use gateway::{DataGateway, GatewayConfig, PayloadValidator, RateLimiter, TtlPolicy};
pub use models::{
    CatalogCoin, CoinDetail, CoinLinks, Envelope, FearGreedEntry, FetchRequest, GatewayResponse,
    MarketCoin, PricePoint, Provenance, Resource, ResourceData, ResourceFamily, TrendingCoin,
    DEFAULT_HISTORY_DAYS, MAX_HISTORY_DAYS,
};
pub use provider::coingecko::CoinGeckoSource;
pub use provider::fear_greed::FearGreedSource;
pub use provider::{RateLimit, UpstreamSource, DEFAULT_UPSTREAM_TIMEOUT};
pub use synth::{FallbackSynthesizer, RandomSynthesizer};
