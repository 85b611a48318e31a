//! Fixture upstream and service builders shared by the analytics tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use coinlens_market_data::models::fear_greed_classification as classify;
use coinlens_market_data::{
    CoinDetail, CoinLinks, DataGateway, EphemeralCache, FearGreedEntry, MarketCoin,
    MarketDataError, PricePoint, RandomSynthesizer, RateLimit, Resource, ResourceData,
    TrendingCoin, UpstreamSource,
};

use crate::market::MarketService;
use crate::simulation::Simulation;

/// Canned upstream answers, or a fixed failure status for every call.
#[derive(Clone)]
pub struct Fixture {
    pub markets_usd: Vec<MarketCoin>,
    pub markets_gbp: Vec<MarketCoin>,
    pub trending: Vec<TrendingCoin>,
    pub coin: CoinDetail,
    pub history: Vec<PricePoint>,
    pub fear_greed: Vec<FearGreedEntry>,
    pub failure: Option<u16>,
}

impl Fixture {
    pub fn live() -> Self {
        let markets_usd = vec![
            market_coin("bitcoin", 60_000.0, 0.05, 0.5, 1.0),
            market_coin("ethereum", 3_000.0, 0.08, -0.2, -1.0),
            market_coin("solana", 150.0, 0.12, 1.0, 2.0),
        ];
        let markets_gbp = markets_usd
            .iter()
            .map(|coin| MarketCoin {
                current_price: coin.current_price * 0.8,
                market_cap: coin.market_cap * 0.8,
                total_volume: coin.total_volume * 0.8,
                ..coin.clone()
            })
            .collect();

        Self {
            markets_usd,
            markets_gbp,
            trending: vec![trending_coin("pepe", Some(24)), trending_coin("solana", Some(5))],
            coin: coin_detail("bitcoin"),
            history: (0..40)
                .map(|i| PricePoint::new(i * 86_400_000, 100.0 + i as f64))
                .collect(),
            fear_greed: [20u8, 30, 40, 50, 60, 70, 80]
                .into_iter()
                .enumerate()
                .map(|(i, value)| FearGreedEntry {
                    value,
                    classification: classify(value).to_string(),
                    timestamp: 1_715_904_000 - i as i64 * 86_400,
                })
                .collect(),
            failure: None,
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            failure: Some(status),
            ..Self::live()
        }
    }
}

#[async_trait]
impl UpstreamSource for Fixture {
    fn id(&self) -> &'static str {
        "FIXTURE"
    }

    fn supports(&self, _resource: &Resource) -> bool {
        true
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 6000,
            burst_capacity: 100.0,
        }
    }

    async fn fetch(
        &self,
        resource: &Resource,
        _params: &BTreeMap<String, String>,
    ) -> Result<ResourceData, MarketDataError> {
        if let Some(status) = self.failure {
            return Err(MarketDataError::Status {
                provider: "FIXTURE".to_string(),
                status,
                body: String::new(),
            });
        }

        Ok(match resource {
            Resource::Markets {
                vs_currency,
                per_page,
                ..
            } => {
                let coins = if vs_currency == "gbp" {
                    &self.markets_gbp
                } else {
                    &self.markets_usd
                };
                ResourceData::Markets(coins.iter().take(*per_page as usize).cloned().collect())
            }
            Resource::CoinDetail { .. } => ResourceData::CoinDetail(Box::new(self.coin.clone())),
            Resource::Trending => ResourceData::Trending(self.trending.clone()),
            Resource::Historical { .. } => ResourceData::Historical(self.history.clone()),
            Resource::FearGreed { limit } => ResourceData::FearGreed(
                self.fear_greed.iter().take(*limit as usize).cloned().collect(),
            ),
        })
    }
}

pub fn gateway_with(fixture: Fixture) -> Arc<DataGateway> {
    Arc::new(DataGateway::new(
        vec![Arc::new(fixture)],
        Arc::new(EphemeralCache::new()),
        Arc::new(RandomSynthesizer::seeded(9)),
    ))
}

pub fn service_with(fixture: Fixture) -> Arc<MarketService> {
    Arc::new(MarketService::new(
        gateway_with(fixture),
        Arc::new(Simulation::seeded(1)),
    ))
}

/// A market row whose volume is `volume_ratio` times its market cap.
pub fn market_coin(
    id: &str,
    price: f64,
    volume_ratio: f64,
    change_1h: f64,
    change_24h: f64,
) -> MarketCoin {
    let market_cap = price * 1_000_000.0;
    MarketCoin {
        id: id.to_string(),
        name: title(id),
        symbol: id.chars().take(3).collect(),
        image: format!("https://example.com/{}.png", id),
        current_price: price,
        market_cap,
        market_cap_rank: None,
        total_volume: market_cap * volume_ratio,
        price_change_percentage_1h: Some(change_1h),
        price_change_percentage_24h: Some(change_24h),
        price_change_percentage_7d: Some(0.0),
    }
}

pub fn trending_coin(id: &str, rank: Option<u32>) -> TrendingCoin {
    TrendingCoin {
        id: id.to_string(),
        name: title(id),
        symbol: id.to_uppercase(),
        image: format!("https://example.com/{}.png", id),
        market_cap_rank: rank,
        score: 0,
    }
}

fn coin_detail(id: &str) -> CoinDetail {
    CoinDetail {
        id: id.to_string(),
        name: title(id),
        symbol: id.chars().take(3).collect(),
        image: String::new(),
        description: String::new(),
        current_price: 60_000.0,
        gbp_price: Some(48_000.0),
        price_change_percentage_24h: Some(1.0),
        price_change_percentage_7d: Some(2.0),
        price_change_percentage_30d: Some(3.0),
        market_cap: 1.2e12,
        gbp_market_cap: Some(0.96e12),
        all_time_high: Some(73_000.0),
        gbp_all_time_high: Some(58_000.0),
        all_time_high_date: None,
        circulating_supply: Some(19_700_000.0),
        max_supply: Some(21_000_000.0),
        volume_usd_24h: Some(2.8e10),
        volume_gbp_24h: Some(2.2e10),
        market_cap_rank: Some(1),
        links: CoinLinks::default(),
    }
}

fn title(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
