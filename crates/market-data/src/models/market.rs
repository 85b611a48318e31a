use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Window of the simple moving average attached to price series.
pub const MOVING_AVERAGE_WINDOW: usize = 14;

/// A row of the market-cap ranked listing, quoted in one currency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub market_cap_rank: Option<u32>,
    pub total_volume: f64,
    pub price_change_percentage_1h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
}

impl MarketCoin {
    /// Volume relative to market cap; 0 when the market cap is unknown.
    pub fn volume_to_market_cap(&self) -> f64 {
        if self.market_cap > 0.0 {
            self.total_volume / self.market_cap
        } else {
            0.0
        }
    }
}

/// External links shown on the coin page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinLinks {
    pub website_url: Option<String>,
    pub twitter_url: Option<String>,
    pub reddit_url: Option<String>,
    pub github_url: Option<String>,
}

/// Flattened coin detail with USD and GBP figures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinDetail {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub description: String,
    pub current_price: f64,
    pub gbp_price: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
    pub price_change_percentage_30d: Option<f64>,
    pub market_cap: f64,
    pub gbp_market_cap: Option<f64>,
    pub all_time_high: Option<f64>,
    pub gbp_all_time_high: Option<f64>,
    pub all_time_high_date: Option<DateTime<Utc>>,
    pub circulating_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub volume_usd_24h: Option<f64>,
    pub volume_gbp_24h: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub links: CoinLinks,
}

/// Entry of the trending search list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub market_cap_rank: Option<u32>,
    /// Position in the trending list, 0 being the hottest.
    pub score: u32,
}

/// Daily price sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// `YYYY-MM-DD`
    pub date: String,
    pub price: f64,
    /// Simple moving average over [`MOVING_AVERAGE_WINDOW`] points, ending at this one.
    pub moving_avg: Option<f64>,
}

impl PricePoint {
    pub fn new(timestamp: i64, price: f64) -> Self {
        let date = DateTime::<Utc>::from_timestamp_millis(timestamp)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        Self {
            timestamp,
            date,
            price,
            moving_avg: None,
        }
    }
}

/// Sort a raw series ascending by timestamp and fill in the moving average.
pub fn with_moving_average(mut points: Vec<PricePoint>, window: usize) -> Vec<PricePoint> {
    points.sort_by_key(|p| p.timestamp);
    if window == 0 {
        return points;
    }

    let mut sum = 0.0;
    for i in 0..points.len() {
        sum += points[i].price;
        if i >= window {
            sum -= points[i - window].price;
        }
        points[i].moving_avg = (i + 1 >= window).then(|| sum / window as f64);
    }
    points
}

/// Fear & Greed index reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FearGreedEntry {
    /// 0 (extreme fear) to 100 (extreme greed).
    pub value: u8,
    pub classification: String,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
}

/// Label for an index value, using the alternative.me bands.
pub fn fear_greed_classification(value: u8) -> &'static str {
    match value {
        0..=24 => "Extreme Fear",
        25..=46 => "Fear",
        47..=54 => "Neutral",
        55..=75 => "Greed",
        _ => "Extreme Greed",
    }
}
