use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::market::{CoinDetail, FearGreedEntry, MarketCoin, PricePoint, TrendingCoin};
use crate::errors::ClassifiedError;

/// Normalised payload for any [`Resource`](super::Resource).
///
/// Serialized untagged: each variant emits exactly the JSON the matching
/// upstream adapter would, so live and synthetic payloads are indistinguishable.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceData {
    Markets(Vec<MarketCoin>),
    CoinDetail(Box<CoinDetail>),
    Trending(Vec<TrendingCoin>),
    Historical(Vec<PricePoint>),
    FearGreed(Vec<FearGreedEntry>),
}

impl ResourceData {
    pub fn as_markets(&self) -> Option<&[MarketCoin]> {
        match self {
            Self::Markets(coins) => Some(coins),
            _ => None,
        }
    }

    pub fn as_coin_detail(&self) -> Option<&CoinDetail> {
        match self {
            Self::CoinDetail(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn as_trending(&self) -> Option<&[TrendingCoin]> {
        match self {
            Self::Trending(coins) => Some(coins),
            _ => None,
        }
    }

    pub fn as_historical(&self) -> Option<&[PricePoint]> {
        match self {
            Self::Historical(points) => Some(points),
            _ => None,
        }
    }

    pub fn as_fear_greed(&self) -> Option<&[FearGreedEntry]> {
        match self {
            Self::FearGreed(entries) => Some(entries),
            _ => None,
        }
    }

    /// Short variant name for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Markets(_) => "markets",
            Self::CoinDetail(_) => "coin",
            Self::Trending(_) => "trending",
            Self::Historical(_) => "historical",
            Self::FearGreed(_) => "fear-greed",
        }
    }
}

/// Where a payload came from. Ordered weakest first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    Synthetic,
    Cached,
    Live,
}

impl Provenance {
    /// Provenance of a value derived from two inputs.
    pub fn weakest(self, other: Self) -> Self {
        self.min(other)
    }
}

/// Data annotated with provenance and, when degraded, the failure that caused it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub data: T,
    pub provenance: Provenance,
    /// True when `data` is a substitute (stale cache or synthetic) served because of `error`.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ClassifiedError>,
    /// When the underlying data was produced.
    pub as_of: DateTime<Utc>,
}

/// What the gateway resolves to.
pub type GatewayResponse = Envelope<Arc<ResourceData>>;

impl<T> Envelope<T> {
    pub fn new(data: T, provenance: Provenance, as_of: DateTime<Utc>) -> Self {
        Self {
            data,
            provenance,
            degraded: false,
            error: None,
            as_of,
        }
    }

    /// Mark this envelope as a substitute served because of `error`.
    pub fn degraded_by(mut self, error: ClassifiedError) -> Self {
        self.degraded = true;
        self.error = Some(error);
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            data: f(self.data),
            provenance: self.provenance,
            degraded: self.degraded,
            error: self.error,
            as_of: self.as_of,
        }
    }

    /// Like [`map`](Self::map), with the provenance visible to `f`.
    pub fn map_with_provenance<U>(self, f: impl FnOnce(T, Provenance) -> U) -> Envelope<U> {
        let provenance = self.provenance;
        self.map(|data| f(data, provenance))
    }

    /// Merge two envelopes into one derived value.
    ///
    /// The result carries the weakest provenance, the oldest timestamp and the
    /// first error found.
    pub fn combine<U, V>(self, other: Envelope<U>, f: impl FnOnce(T, U) -> V) -> Envelope<V> {
        Envelope {
            data: f(self.data, other.data),
            provenance: self.provenance.weakest(other.provenance),
            degraded: self.degraded || other.degraded,
            error: self.error.or(other.error),
            as_of: self.as_of.min(other.as_of),
        }
    }
}
