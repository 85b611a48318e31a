//! CoinGecko API response models.
//!
//! Only the fields the dashboard uses are mapped. Numeric fields are optional
//! because CoinGecko returns `null` for thinly traded coins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Row of `/coins/markets`
#[derive(Debug, Deserialize)]
pub struct MarketItem {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,
}

/// `/coins/{id}` with `market_data=true`
#[derive(Debug, Deserialize)]
pub struct CoinResponse {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: ImageUrls,
    #[serde(default)]
    pub description: Description,
    #[serde(default)]
    pub links: Links,
    pub market_cap_rank: Option<u32>,
    pub market_data: MarketData,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageUrls {
    #[serde(default)]
    pub large: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub en: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub homepage: Vec<String>,
    #[serde(default)]
    pub twitter_screen_name: Option<String>,
    #[serde(default)]
    pub subreddit_url: Option<String>,
    #[serde(default)]
    pub repos_url: ReposUrl,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReposUrl {
    #[serde(default)]
    pub github: Vec<String>,
}

/// Per-currency figures keyed by lowercase currency code.
pub type CurrencyMap = HashMap<String, Option<f64>>;

#[derive(Debug, Deserialize)]
pub struct MarketData {
    pub current_price: CurrencyMap,
    #[serde(default)]
    pub market_cap: CurrencyMap,
    #[serde(default)]
    pub total_volume: CurrencyMap,
    #[serde(default)]
    pub ath: CurrencyMap,
    #[serde(default)]
    pub ath_date: HashMap<String, Option<DateTime<Utc>>>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
    pub price_change_percentage_30d: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub max_supply: Option<f64>,
}

/// `/search/trending`
#[derive(Debug, Deserialize)]
pub struct TrendingResponse {
    pub coins: Vec<TrendingItemWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingItemWrapper {
    pub item: TrendingItem,
}

#[derive(Debug, Deserialize)]
pub struct TrendingItem {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub large: Option<String>,
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub score: u32,
}

/// `/coins/{id}/market_chart`
#[derive(Debug, Deserialize)]
pub struct MarketChartResponse {
    /// `[timestamp_ms, price]` pairs
    pub prices: Vec<(f64, f64)>,
}
