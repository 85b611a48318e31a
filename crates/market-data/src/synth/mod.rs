//! Fallback data synthesis.
//!
//! When neither the upstream nor the cache can answer, the gateway asks a
//! [`FallbackSynthesizer`] for a payload with exactly the shape a live call would
//! have produced. Values are plausible, not real.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{Duration as ChronoDuration, Utc};
use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::errors::MarketDataError;
use crate::models::catalog::{self, CatalogCoin, TOP_COINS};
use crate::models::{
    fear_greed_classification, with_moving_average, CoinDetail, CoinLinks, FearGreedEntry,
    MarketCoin, PricePoint, Resource, ResourceData, TrendingCoin, MOVING_AVERAGE_WINDOW,
};

const DAY_MS: i64 = 86_400_000;

/// Number of coins the trending endpoint returns.
const TRENDING_COUNT: usize = 7;

/// Maximum relative day-to-day move of a synthetic price series.
const DAILY_DRIFT: f64 = 0.01;

/// Produces substitute payloads without any I/O.
pub trait FallbackSynthesizer: Send + Sync {
    /// Generate a payload for `resource`.
    ///
    /// An `Err` here is a bug, not an upstream condition.
    fn synthesize(
        &self,
        resource: &Resource,
        params: &BTreeMap<String, String>,
    ) -> Result<ResourceData, MarketDataError>;
}

/// Synthesizer backed by a pseudo-random generator. Seed it for reproducible tests.
pub struct RandomSynthesizer {
    rng: Mutex<StdRng>,
}

impl RandomSynthesizer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackSynthesizer for RandomSynthesizer {
    fn synthesize(
        &self,
        resource: &Resource,
        _params: &BTreeMap<String, String>,
    ) -> Result<ResourceData, MarketDataError> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| {
            warn!("Synthesizer RNG mutex was poisoned, recovering");
            poisoned.into_inner()
        });
        synthesize_with(resource, &mut *rng)
    }
}

/// Generate a payload for `resource` from an explicit random source.
pub fn synthesize_with<R: Rng + ?Sized>(
    resource: &Resource,
    rng: &mut R,
) -> Result<ResourceData, MarketDataError> {
    let data = match resource {
        Resource::Markets {
            vs_currency,
            per_page,
            page,
        } => ResourceData::Markets(markets(vs_currency, *per_page, *page, rng)),
        Resource::CoinDetail { id } => ResourceData::CoinDetail(Box::new(coin_detail(id, rng))),
        Resource::Trending => ResourceData::Trending(trending(rng)),
        Resource::Historical { id, days } => {
            let base = base_price(id, rng);
            ResourceData::Historical(price_series(base, *days, rng))
        }
        Resource::FearGreed { limit } => ResourceData::FearGreed(fear_greed(*limit, rng)),
    };

    if matches!(&data, ResourceData::Historical(points) if points.is_empty()) {
        return Err(MarketDataError::Synthesis {
            resource: resource.key(),
            message: "generated an empty price series".to_string(),
        });
    }
    Ok(data)
}

/// Conversion factor from USD, close enough for placeholder figures.
fn currency_factor(vs_currency: &str) -> f64 {
    match vs_currency {
        "gbp" => 0.8,
        "eur" => 0.92,
        _ => 1.0,
    }
}

fn base_price<R: Rng + ?Sized>(id: &str, rng: &mut R) -> f64 {
    catalog::lookup(id)
        .map(|coin| coin.base_price_usd)
        .unwrap_or_else(|| 1.0 + rng.gen::<f64>() * 100.0)
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, spread: f64) -> f64 {
    1.0 + rng.gen_range(-spread..spread)
}

fn market_coin<R: Rng + ?Sized>(
    coin: &CatalogCoin,
    rank: u32,
    factor: f64,
    rng: &mut R,
) -> MarketCoin {
    let current_price = coin.base_price_usd * factor * jitter(rng, 0.05);
    // Keeps the list ordered by market cap as rank grows.
    let market_cap = 1.0e12 * factor / f64::from(rank) * jitter(rng, 0.02);
    MarketCoin {
        id: coin.id.to_string(),
        name: coin.name.to_string(),
        symbol: coin.symbol.to_string(),
        image: coin.image_url(),
        current_price,
        market_cap,
        market_cap_rank: Some(rank),
        total_volume: market_cap * rng.gen_range(0.02..0.15),
        price_change_percentage_1h: Some(rng.gen_range(-2.0..2.0)),
        price_change_percentage_24h: Some(rng.gen_range(-8.0..8.0)),
        price_change_percentage_7d: Some(rng.gen_range(-15.0..15.0)),
    }
}

fn markets<R: Rng + ?Sized>(
    vs_currency: &str,
    per_page: u32,
    page: u32,
    rng: &mut R,
) -> Vec<MarketCoin> {
    let factor = currency_factor(vs_currency);
    let offset = (page.saturating_sub(1) as usize).saturating_mul(per_page as usize);
    TOP_COINS
        .iter()
        .enumerate()
        .skip(offset)
        .take(per_page as usize)
        .map(|(i, coin)| market_coin(coin, i as u32 + 1, factor, rng))
        .collect()
}

fn title_case(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn coin_detail<R: Rng + ?Sized>(id: &str, rng: &mut R) -> CoinDetail {
    let known = catalog::lookup(id);
    let name = known.map_or_else(|| title_case(id), |c| c.name.to_string());
    let symbol = known.map_or_else(
        || id.chars().filter(|c| c.is_ascii_alphanumeric()).take(4).collect(),
        |c| c.symbol.to_string(),
    );
    let rank = catalog::rank_of(id).unwrap_or_else(|| rng.gen_range(21..200));

    let price = base_price(id, rng) * jitter(rng, 0.05);
    let market_cap = 1.0e12 / f64::from(rank) * jitter(rng, 0.02);
    let circulating = market_cap / price;
    let ath = price * rng.gen_range(1.1..3.0);

    CoinDetail {
        id: id.to_string(),
        name: name.clone(),
        symbol,
        image: format!("https://assets.coingecko.com/coins/images/{}/large/{}.png", id, id),
        description: format!("{} is a cryptocurrency. Live data is temporarily unavailable.", name),
        current_price: price,
        gbp_price: Some(price * 0.8),
        price_change_percentage_24h: Some(rng.gen_range(-8.0..8.0)),
        price_change_percentage_7d: Some(rng.gen_range(-15.0..15.0)),
        price_change_percentage_30d: Some(rng.gen_range(-30.0..30.0)),
        market_cap,
        gbp_market_cap: Some(market_cap * 0.8),
        all_time_high: Some(ath),
        gbp_all_time_high: Some(ath * 0.8),
        all_time_high_date: Some(Utc::now() - ChronoDuration::days(rng.gen_range(30..1500))),
        circulating_supply: Some(circulating),
        max_supply: rng.gen_bool(0.5).then(|| circulating * rng.gen_range(1.0..2.0)),
        volume_usd_24h: Some(market_cap * rng.gen_range(0.02..0.15)),
        volume_gbp_24h: Some(market_cap * 0.8 * rng.gen_range(0.02..0.15)),
        market_cap_rank: Some(rank),
        links: CoinLinks {
            website_url: None,
            twitter_url: None,
            reddit_url: None,
            github_url: None,
        },
    }
}

fn trending<R: Rng + ?Sized>(rng: &mut R) -> Vec<TrendingCoin> {
    TOP_COINS
        .choose_multiple(rng, TRENDING_COUNT)
        .enumerate()
        .map(|(score, coin)| TrendingCoin {
            id: coin.id.to_string(),
            name: coin.name.to_string(),
            symbol: coin.symbol.to_string(),
            image: coin.image_url(),
            market_cap_rank: catalog::rank_of(coin.id),
            score: score as u32,
        })
        .collect()
}

/// `days + 1` daily points ending today, each within 1% of the previous one.
pub fn price_series<R: Rng + ?Sized>(base_price: f64, days: u32, rng: &mut R) -> Vec<PricePoint> {
    let today = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default();

    let mut price = base_price;
    let points = (0..=i64::from(days))
        .rev()
        .enumerate()
        .map(|(i, days_ago)| {
            if i > 0 {
                price = (price + rng.gen_range(-1.0..1.0) * base_price * DAILY_DRIFT).max(0.0);
            }
            PricePoint::new(today - days_ago * DAY_MS, price)
        })
        .collect();

    with_moving_average(points, MOVING_AVERAGE_WINDOW)
}

fn fear_greed<R: Rng + ?Sized>(limit: u32, rng: &mut R) -> Vec<FearGreedEntry> {
    let now = Utc::now().timestamp();
    let mut value: i32 = rng.gen_range(0..=100);
    (0..i64::from(limit.max(1)))
        .map(|days_ago| {
            if days_ago > 0 {
                value = (value + rng.gen_range(-8..=8)).clamp(0, 100);
            }
            let reading = value as u8;
            FearGreedEntry {
                value: reading,
                classification: fear_greed_classification(reading).to_string(),
                timestamp: now - days_ago * 86_400,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_markets_are_ranked_and_paged() {
        let mut rng = seeded();
        let coins = markets("usd", 5, 2, &mut rng);
        assert_eq!(coins.len(), 5);
        assert_eq!(coins[0].id, TOP_COINS[5].id);
        assert_eq!(coins[0].market_cap_rank, Some(6));
        assert!(coins.windows(2).all(|w| w[0].market_cap > w[1].market_cap));

        assert!(markets("usd", 20, 5, &mut rng).is_empty());
    }

    #[test]
    fn test_gbp_markets_are_cheaper() {
        let mut rng = seeded();
        let usd = markets("usd", 1, 1, &mut rng);
        let gbp = markets("gbp", 1, 1, &mut rng);
        assert!(gbp[0].current_price < usd[0].current_price);
    }

    #[test]
    fn test_historical_series_shape() {
        let mut rng = seeded();
        let data = synthesize_with(&Resource::historical("bitcoin", 60), &mut rng).unwrap();
        let points = data.as_historical().unwrap();

        assert_eq!(points.len(), 61);
        assert!(points.windows(2).all(|w| w[1].timestamp - w[0].timestamp == DAY_MS));
        assert!(points[..13].iter().all(|p| p.moving_avg.is_none()));
        assert!(points[13..].iter().all(|p| p.moving_avg.is_some()));
        // Random walk stays near the catalog price
        assert!(points.iter().all(|p| p.price > 50_000.0 * 0.3 && p.price < 50_000.0 * 1.7));
    }

    #[test]
    fn test_unknown_coin_detail_is_still_complete() {
        let mut rng = seeded();
        let detail = coin_detail("some-new-token", &mut rng);
        assert_eq!(detail.name, "Some New Token");
        assert_eq!(detail.symbol, "some");
        assert!(detail.current_price > 0.0);
        assert!(detail.market_cap_rank.unwrap() > 20);
    }

    #[test]
    fn test_trending_has_distinct_coins() {
        let mut rng = seeded();
        let coins = trending(&mut rng);
        assert_eq!(coins.len(), TRENDING_COUNT);
        let mut ids: Vec<_> = coins.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), TRENDING_COUNT);
        assert_eq!(coins[0].score, 0);
    }

    #[test]
    fn test_fear_greed_values_in_range() {
        let mut rng = seeded();
        let entries = fear_greed(30, &mut rng);
        assert_eq!(entries.len(), 30);
        for entry in &entries {
            assert!(entry.value <= 100);
            assert_eq!(entry.classification, fear_greed_classification(entry.value));
        }
        assert!(entries[0].timestamp > entries[1].timestamp);
    }

    #[test]
    fn test_seeded_synthesizer_is_reproducible() {
        let params = BTreeMap::new();
        let resource = Resource::markets("usd", 10);
        let a = RandomSynthesizer::seeded(7).synthesize(&resource, &params).unwrap();
        let b = RandomSynthesizer::seeded(7).synthesize(&resource, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_synthetic_payloads_match_upstream_shape() {
        use crate::provider::coingecko::{samples as gecko, CoinGeckoSource};
        use crate::provider::fear_greed::{samples as fng, FearGreedSource};
        use crate::testing::shape;

        let cases = [
            (
                Resource::markets("usd", 2),
                CoinGeckoSource::parse(&Resource::markets("usd", 2), gecko::MARKETS),
            ),
            (
                Resource::coin("bitcoin"),
                CoinGeckoSource::parse(&Resource::coin("bitcoin"), gecko::COIN),
            ),
            (Resource::Trending, CoinGeckoSource::parse(&Resource::Trending, gecko::TRENDING)),
            (
                Resource::historical("bitcoin", 2),
                CoinGeckoSource::parse(&Resource::historical("bitcoin", 2), gecko::MARKET_CHART),
            ),
            (Resource::fear_greed(2), FearGreedSource::parse(fng::FNG)),
        ];

        let synthesizer = RandomSynthesizer::seeded(5);
        for (resource, live) in cases {
            let live = serde_json::to_value(live.unwrap()).unwrap();
            let synthetic = synthesizer.synthesize(&resource, &BTreeMap::new()).unwrap();
            let synthetic = serde_json::to_value(synthetic).unwrap();
            assert_eq!(shape(&live), shape(&synthetic), "{}", resource);
        }
    }
}
