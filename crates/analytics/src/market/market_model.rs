use chrono::{DateTime, Utc};
use coinlens_market_data::CoinDetail;
use serde::{Deserialize, Serialize};

/// One row of the market list: USD figures merged with GBP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketListing {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub current_price: f64,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap: f64,
    pub gbp_price: f64,
    pub gbp_market_cap: f64,
    pub gbp_volume: f64,
    /// Simulated, 0-99.
    pub sentiment_score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsSentiment {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: u32,
    pub title: String,
    pub source: String,
    pub date: DateTime<Utc>,
    pub sentiment: NewsSentiment,
}

/// Coin detail page: upstream detail plus simulated sentiment and news.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinOverview {
    #[serde(flatten)]
    pub detail: CoinDetail,
    pub sentiment_score: u8,
    pub news: Vec<NewsItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketBias {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingListing {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    /// USD price from the markets snapshot, 0 when the coin is not listed there.
    pub price: f64,
    pub sentiment: MarketBias,
    pub hot_topic: bool,
}

/// A coin the forecaster can be trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinOption {
    pub id: String,
    pub name: String,
    pub symbol: String,
}
