use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use coinlens_market_data::models::catalog::TOP_COINS;
use coinlens_market_data::{
    DataGateway, Envelope, FearGreedEntry, MarketCoin, PricePoint, Resource, ResourceData,
    TrendingCoin, DEFAULT_HISTORY_DAYS,
};
use log::debug;
use rand::Rng;

use super::market_model::{
    CoinOption, CoinOverview, MarketBias, MarketListing, NewsItem, NewsSentiment, TrendingListing,
};
use crate::errors::{AnalyticsError, Result};
use crate::simulation::Simulation;

/// Size of the market list and of the analysis universes.
pub const TOP_LIST_SIZE: u32 = 20;
/// Size of the snapshot used to price trending coins and scan for momentum.
pub const SCAN_SIZE: u32 = 100;
const TRENDING_LIST_SIZE: usize = 5;

/// Fetches gateway resources and shapes them for the dashboard.
pub struct MarketService {
    gateway: Arc<DataGateway>,
    simulation: Arc<Simulation>,
}

impl MarketService {
    pub fn new(gateway: Arc<DataGateway>, simulation: Arc<Simulation>) -> Self {
        Self {
            gateway,
            simulation,
        }
    }

    pub fn simulation(&self) -> &Arc<Simulation> {
        &self.simulation
    }

    async fn fetch<T>(
        &self,
        resource: Resource,
        expected: &'static str,
        extract: impl FnOnce(&ResourceData) -> Option<T>,
    ) -> Result<Envelope<T>> {
        let response = self.gateway.fetch_resource(resource).await?;
        let Some(value) = extract(&response.data) else {
            return Err(AnalyticsError::UnexpectedPayload {
                expected,
                actual: response.data.kind_name(),
            });
        };
        Ok(response.map(|_| value))
    }

    /// Markets page 1 in `vs_currency`.
    pub async fn markets(
        &self,
        vs_currency: &str,
        per_page: u32,
    ) -> Result<Envelope<Vec<MarketCoin>>> {
        self.fetch(Resource::markets(vs_currency, per_page), "markets", |data| {
            data.as_markets().map(<[MarketCoin]>::to_vec)
        })
        .await
    }

    pub async fn trending_coins(&self) -> Result<Envelope<Vec<TrendingCoin>>> {
        self.fetch(Resource::Trending, "trending", |data| {
            data.as_trending().map(<[TrendingCoin]>::to_vec)
        })
        .await
    }

    pub async fn fear_greed(&self, limit: u32) -> Result<Envelope<Vec<FearGreedEntry>>> {
        self.fetch(Resource::fear_greed(limit), "fear-greed", |data| {
            data.as_fear_greed().map(<[FearGreedEntry]>::to_vec)
        })
        .await
    }

    /// Daily USD history for `coin`, `days` defaulting to 60.
    pub async fn historical(
        &self,
        coin: &str,
        days: Option<u32>,
    ) -> Result<Envelope<Vec<PricePoint>>> {
        let coin = require_id(coin)?;
        let resource = Resource::historical(coin, days.unwrap_or(DEFAULT_HISTORY_DAYS));
        self.fetch(resource, "historical", |data| {
            data.as_historical().map(<[PricePoint]>::to_vec)
        })
        .await
    }

    /// Top coins by market cap with GBP figures and a simulated sentiment score.
    pub async fn list_markets(&self) -> Result<Envelope<Vec<MarketListing>>> {
        let usd = self.markets("usd", TOP_LIST_SIZE).await?;
        let gbp = self.markets("gbp", TOP_LIST_SIZE).await?;

        Ok(usd.combine(gbp, |usd, gbp| {
            let gbp_by_id: HashMap<&str, &MarketCoin> =
                gbp.iter().map(|coin| (coin.id.as_str(), coin)).collect();
            self.simulation.with(|rng| {
                usd.iter()
                    .map(|coin| {
                        let gbp = gbp_by_id.get(coin.id.as_str());
                        MarketListing {
                            id: coin.id.clone(),
                            name: coin.name.clone(),
                            symbol: coin.symbol.clone(),
                            image: coin.image.clone(),
                            current_price: coin.current_price,
                            price_change_percentage_24h: coin.price_change_percentage_24h,
                            market_cap: coin.market_cap,
                            gbp_price: gbp.map_or(0.0, |g| g.current_price),
                            gbp_market_cap: gbp.map_or(0.0, |g| g.market_cap),
                            gbp_volume: gbp.map_or(0.0, |g| g.total_volume),
                            sentiment_score: rng.gen_range(0..100),
                        }
                    })
                    .collect()
            })
        }))
    }

    pub async fn coin_overview(&self, id: &str) -> Result<Envelope<CoinOverview>> {
        let id = require_id(id)?;
        let detail = self
            .fetch(Resource::coin(id), "coin", |data| data.as_coin_detail().cloned())
            .await?;

        Ok(detail.map(|detail| {
            let sentiment_score = self.simulation.with(|rng| rng.gen_range(0..100));
            let news = generated_news(&detail.name);
            CoinOverview {
                detail,
                sentiment_score,
                news,
            }
        }))
    }

    /// First trending coins, priced from the markets snapshot.
    pub async fn trending(&self) -> Result<Envelope<Vec<TrendingListing>>> {
        let trending = self.trending_coins().await?;
        let snapshot = self.markets("usd", SCAN_SIZE).await?;

        Ok(trending.combine(snapshot, |trending, snapshot| {
            let prices: HashMap<&str, f64> = snapshot
                .iter()
                .map(|coin| (coin.id.as_str(), coin.current_price))
                .collect();
            self.simulation.with(|rng| {
                trending
                    .iter()
                    .take(TRENDING_LIST_SIZE)
                    .map(|coin| TrendingListing {
                        id: coin.id.clone(),
                        name: coin.name.clone(),
                        symbol: coin.symbol.clone(),
                        image: coin.image.clone(),
                        price: prices.get(coin.id.as_str()).copied().unwrap_or(0.0),
                        sentiment: if rng.gen_bool(0.5) {
                            MarketBias::Bullish
                        } else {
                            MarketBias::Bearish
                        },
                        hot_topic: rng.gen_bool(0.3),
                    })
                    .collect()
            })
        }))
    }

    /// Coins offered for forecasting.
    pub fn prediction_options() -> Vec<CoinOption> {
        TOP_COINS
            .iter()
            .map(|coin| CoinOption {
                id: coin.id.to_string(),
                name: coin.name.to_string(),
                symbol: coin.symbol.to_string(),
            })
            .collect()
    }
}

fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains(':') {
        debug!("Rejected coin id '{}'", id);
        return Err(AnalyticsError::InvalidInput(format!("invalid coin id '{}'", id)));
    }
    Ok(id)
}

fn generated_news(name: &str) -> Vec<NewsItem> {
    let now = Utc::now();
    vec![
        NewsItem {
            id: 1,
            title: format!("Major Development for {} Ecosystem", name),
            source: "CryptoNews".to_string(),
            date: now,
            sentiment: NewsSentiment::Positive,
        },
        NewsItem {
            id: 2,
            title: format!(
                "{} Price Analysis: Technical Indicators Point to Potential Breakout",
                name
            ),
            source: "CoinAnalyst".to_string(),
            date: now - Duration::days(1),
            sentiment: NewsSentiment::Positive,
        },
        NewsItem {
            id: 3,
            title: format!("Regulatory Concerns Grow for {} in Asian Markets", name),
            source: "BlockchainToday".to_string(),
            date: now - Duration::days(2),
            sentiment: NewsSentiment::Negative,
        },
    ]
}
