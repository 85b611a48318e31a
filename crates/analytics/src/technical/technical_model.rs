use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiStatus {
    Overbought,
    Oversold,
    Neutral,
}

/// Bullish, bearish or neither. Used for MACD trend, crossover and outlook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Crossover {
    Bullish,
    Bearish,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsiReading {
    pub value: f64,
    pub status: RsiStatus,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdReading {
    pub value: f64,
    pub signal: f64,
    pub histogram: f64,
    pub trend: Direction,
    pub crossover: Crossover,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResistance {
    pub support1: f64,
    pub support2: f64,
    pub resistance1: f64,
    pub resistance2: f64,
    pub nearest_level: f64,
    #[serde(rename = "nearestLevelGBP")]
    pub nearest_level_gbp: f64,
    /// `support1`, `support2`, `resistance1` or `resistance2`.
    pub nearest_type: String,
    #[serde(rename = "support1GBP")]
    pub support1_gbp: f64,
    #[serde(rename = "support2GBP")]
    pub support2_gbp: f64,
    #[serde(rename = "resistance1GBP")]
    pub resistance1_gbp: f64,
    #[serde(rename = "resistance2GBP")]
    pub resistance2_gbp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalOutlook {
    pub outlook: Direction,
    pub strength: Strength,
    pub description: &'static str,
    pub prediction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIndicators {
    pub rsi: RsiReading,
    pub macd: MacdReading,
    pub support_resistance: SupportResistance,
    pub technical_outlook: TechnicalOutlook,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinTechnicals {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub current_price: f64,
    pub gbp_price: f64,
    pub price_change_24h: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub technical_indicators: TechnicalIndicators,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalReport {
    pub timestamp: DateTime<Utc>,
    pub data: Vec<CoinTechnicals>,
    pub disclaimer: &'static str,
}
