use chrono::NaiveDate;
use serde::Serialize;

/// Month-over-month direction of M2 money supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityTrend {
    IncreasingRapidly,
    Increasing,
    Stable,
    Decreasing,
    DecreasingRapidly,
}

impl LiquidityTrend {
    /// Classify a month-over-month change given in percent.
    pub fn from_monthly_change(percent: f64) -> Self {
        if percent > 1.0 {
            Self::IncreasingRapidly
        } else if percent > 0.2 {
            Self::Increasing
        } else if percent < -1.0 {
            Self::DecreasingRapidly
        } else if percent < -0.2 {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }

    pub fn is_increasing(self) -> bool {
        matches!(self, Self::Increasing | Self::IncreasingRapidly)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FearGreedReading {
    pub value: u8,
    pub classification: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FearGreedHistoryItem {
    pub value: u8,
    pub classification: String,
    /// Unix timestamp in seconds.
    pub date: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FearAndGreed {
    pub current: FearGreedReading,
    pub history: Vec<FearGreedHistoryItem>,
}

/// One monthly M2 observation, in trillions of USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct M2Point {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Change {
    pub value: f64,
    /// Rounded to two decimals.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendDefinitions {
    pub increasing_rapidly: &'static str,
    pub increasing: &'static str,
    pub stable: &'static str,
    pub decreasing: &'static str,
    pub decreasing_rapidly: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct M2MoneySupply {
    pub current: M2Point,
    pub history: Vec<M2Point>,
    pub trend: LiquidityTrend,
    pub monthly_change: Change,
    pub six_month_change: Change,
    pub trend_definitions: TrendDefinitions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInsights {
    pub fear_and_greed: FearAndGreed,
    pub m2_money_supply: M2MoneySupply,
    pub market_advice: &'static str,
}
