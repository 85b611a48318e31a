use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::errors::MarketDataError;

/// Default page size for market listings.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page CoinGecko serves for `/coins/markets`.
pub const MAX_PER_PAGE: u32 = 250;

/// Default day range for historical series.
pub const DEFAULT_HISTORY_DAYS: u32 = 60;

/// Largest accepted history range.
pub const MAX_HISTORY_DAYS: u32 = 365;

/// Typed form of a resource key.
///
/// The canonical string form returned by [`key`](Self::key) is what the cache is keyed on and
/// round-trips through [`parse`](Self::parse):
///
/// ```
/// use coinlens_market_data::Resource;
///
/// let resource = Resource::parse("historical:bitcoin:60").unwrap();
/// assert_eq!(resource, Resource::Historical { id: "bitcoin".into(), days: 60 });
/// assert_eq!(resource.key(), "historical:bitcoin:60");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Resource {
    /// Coins ranked by market cap, quoted in `vs_currency`.
    Markets {
        vs_currency: String,
        per_page: u32,
        page: u32,
    },
    /// Detail for a single coin.
    CoinDetail { id: String },
    /// Currently trending coins.
    Trending,
    /// Daily USD price history.
    Historical { id: String, days: u32 },
    /// Fear & Greed index, most recent first.
    FearGreed { limit: u32 },
}

/// Resource families share a cache TTL.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ResourceFamily {
    Markets,
    Coin,
    Trending,
    Historical,
    FearGreed,
}

impl Resource {
    /// Top coins in the given currency, first page.
    pub fn markets(vs_currency: &str, per_page: u32) -> Self {
        Self::Markets {
            vs_currency: vs_currency.to_ascii_lowercase(),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            page: 1,
        }
    }

    pub fn coin(id: &str) -> Self {
        Self::CoinDetail { id: id.to_string() }
    }

    pub fn historical(id: &str, days: u32) -> Self {
        Self::Historical {
            id: id.to_string(),
            days: days.clamp(1, MAX_HISTORY_DAYS),
        }
    }

    pub fn fear_greed(limit: u32) -> Self {
        Self::FearGreed {
            limit: limit.max(1),
        }
    }

    pub fn family(&self) -> ResourceFamily {
        match self {
            Self::Markets { .. } => ResourceFamily::Markets,
            Self::CoinDetail { .. } => ResourceFamily::Coin,
            Self::Trending => ResourceFamily::Trending,
            Self::Historical { .. } => ResourceFamily::Historical,
            Self::FearGreed { .. } => ResourceFamily::FearGreed,
        }
    }

    /// Canonical cache key.
    pub fn key(&self) -> String {
        match self {
            Self::Markets {
                vs_currency,
                per_page,
                page,
            } => format!("markets:{}:{}:{}", vs_currency, per_page, page),
            Self::CoinDetail { id } => format!("coin:{}", id),
            Self::Trending => "trending".to_string(),
            Self::Historical { id, days } => format!("historical:{}:{}", id, days),
            Self::FearGreed { limit } => format!("fear-greed:{}", limit),
        }
    }

    /// Parse a canonical key such as `markets:usd:20:1` or `coin:bitcoin`.
    pub fn parse(key: &str) -> Result<Self, MarketDataError> {
        let invalid =
            || MarketDataError::InvalidRequest(format!("malformed resource key '{}'", key));
        let parts: Vec<&str> = key.split(':').collect();

        let resource = match parts.as_slice() {
            ["markets", vs, per_page, page] => Self::Markets {
                vs_currency: non_empty(vs).ok_or_else(invalid)?.to_ascii_lowercase(),
                per_page: parse_bounded(per_page, 1, MAX_PER_PAGE).ok_or_else(invalid)?,
                page: parse_bounded(page, 1, u32::MAX).ok_or_else(invalid)?,
            },
            ["coin", id] => Self::CoinDetail {
                id: coin_id(id).ok_or_else(invalid)?,
            },
            ["trending"] => Self::Trending,
            ["historical", id, days] => Self::Historical {
                id: coin_id(id).ok_or_else(invalid)?,
                days: parse_bounded(days, 1, MAX_HISTORY_DAYS).ok_or_else(invalid)?,
            },
            ["fear-greed", limit] => Self::FearGreed {
                limit: parse_bounded(limit, 1, 365).ok_or_else(invalid)?,
            },
            _ => return Err(invalid()),
        };
        Ok(resource)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Coin ids are lowercase slugs such as `avalanche-2`.
fn coin_id(value: &str) -> Option<String> {
    let id = non_empty(value)?;
    id.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .then(|| id.to_ascii_lowercase())
}

fn parse_bounded(value: &str, min: u32, max: u32) -> Option<u32> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

/// A unit of desired data.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub resource: Resource,
    /// Extra query parameters sent to the upstream alongside the resource's own.
    /// They are part of the cache key; the resource's own parameters take precedence.
    pub params: BTreeMap<String, String>,
    /// Maximum age at which a cached entry is still preferred over a fresh fetch.
    /// Falls back to the entry's own TTL when `None`.
    pub staleness_budget: Option<Duration>,
    /// Zero-based retry counter, stamped onto any classified failure.
    pub attempt: u32,
}

impl FetchRequest {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            params: BTreeMap::new(),
            staleness_budget: None,
            attempt: 0,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_staleness_budget(mut self, budget: Duration) -> Self {
        self.staleness_budget = Some(budget);
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Cache key: the resource key plus any extra parameters in sorted order.
    pub fn cache_key(&self) -> String {
        if self.params.is_empty() {
            return self.resource.key();
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.resource.key(), query)
    }
}

impl From<Resource> for FetchRequest {
    fn from(resource: Resource) -> Self {
        Self::new(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_canonical_keys() {
        for key in [
            "markets:usd:20:1",
            "markets:gbp:100:2",
            "coin:avalanche-2",
            "trending",
            "historical:bitcoin:60",
            "fear-greed:7",
        ] {
            assert_eq!(Resource::parse(key).unwrap().key(), key);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        for key in [
            "",
            "markets:usd:0:1",
            "markets:usd:20",
            "coin:",
            "coin:bit coin",
            "historical:bitcoin:abc",
            "historical:bitcoin:0",
            "historical:bitcoin:9999",
            "weather:london",
        ] {
            let err = Resource::parse(key).unwrap_err();
            assert!(matches!(err, MarketDataError::InvalidRequest(_)), "{}", key);
        }
    }

    #[test]
    fn test_constructors_normalise_input() {
        assert_eq!(
            Resource::markets("USD", 1000).key(),
            format!("markets:usd:{}:1", MAX_PER_PAGE)
        );
        assert_eq!(Resource::historical("bitcoin", 0).key(), "historical:bitcoin:1");
        assert_eq!(Resource::fear_greed(0).key(), "fear-greed:1");
    }

    #[test]
    fn test_cache_key_includes_sorted_params() {
        let request = FetchRequest::new(Resource::Trending)
            .with_param("z", "1")
            .with_param("a", "2");
        assert_eq!(request.cache_key(), "trending?a=2&z=1");
        assert_eq!(FetchRequest::new(Resource::Trending).cache_key(), "trending");
    }
}
