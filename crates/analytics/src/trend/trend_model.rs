use chrono::{DateTime, Utc};
use serde::Serialize;

/// A coin flagged by the momentum scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumSignal {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub current_price: f64,
    pub gbp_price: f64,
    pub price_change_1h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_7d: Option<f64>,
    pub volume: f64,
    pub volume_to_market_cap: f64,
    pub signals: Vec<&'static str>,
    /// Simulated social mentions.
    pub recent_mentions: u32,
    /// Simulated trending position.
    pub trending_rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingSignal {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub market_cap_rank: Option<u32>,
    pub price: f64,
    pub gbp_price: f64,
    pub signals: Vec<&'static str>,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsMention {
    pub id: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub image: &'static str,
    pub mentions: u32,
    /// 0-1, higher is more positive.
    pub sentiment: f64,
    pub headlines: [&'static str; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub timestamp: DateTime<Utc>,
    pub potential_pumps: Vec<MomentumSignal>,
    pub potential_drops: Vec<MomentumSignal>,
    pub trending_coins: Vec<TrendingSignal>,
    pub top_news_mentions: Vec<NewsMention>,
    pub disclaimer: &'static str,
}
