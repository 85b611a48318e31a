use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate, Utc};
use coinlens_market_data::{Envelope, FearGreedEntry};

use super::insights_model::{
    Change, FearAndGreed, FearGreedHistoryItem, FearGreedReading, LiquidityTrend, M2MoneySupply,
    M2Point, MarketInsights, TrendDefinitions,
};
use crate::errors::{AnalyticsError, Result};
use crate::market::MarketService;
use crate::technical::round_to;

/// Days of Fear & Greed history shown.
pub const FEAR_GREED_HISTORY: u32 = 7;

/// Simulated M2 money supply, oldest first, in trillions of USD.
const M2_SERIES: [f64; 6] = [20.82, 20.79, 20.85, 20.91, 21.03, 21.18];

const TREND_DEFINITIONS: TrendDefinitions = TrendDefinitions {
    increasing_rapidly: "Growth exceeding 1% month-over-month",
    increasing: "Growth between 0.2% and 1% month-over-month",
    stable: "Change between -0.2% and 0.2% month-over-month",
    decreasing: "Decline between -0.2% and -1% month-over-month",
    decreasing_rapidly: "Decline exceeding 1% month-over-month",
};

/// Six monthly points dated the first of each month, ending with the current month.
pub fn m2_history(today: NaiveDate) -> Vec<M2Point> {
    let first = today.with_day(1).unwrap_or(today);
    let last = M2_SERIES.len() - 1;
    M2_SERIES
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let months_back = (last - i) as u32;
            let date = first
                .checked_sub_months(Months::new(months_back))
                .unwrap_or(first);
            M2Point { date, value }
        })
        .collect()
}

fn change(from: f64, to: f64) -> Change {
    Change {
        value: to - from,
        percent: round_to((to - from) / from * 100.0, 2),
    }
}

pub fn m2_money_supply(today: NaiveDate) -> M2MoneySupply {
    let history = m2_history(today);
    let current = history[history.len() - 1];
    let previous = history[history.len() - 2];
    let oldest = history[0];

    let monthly_percent = (current.value - previous.value) / previous.value * 100.0;
    M2MoneySupply {
        current,
        trend: LiquidityTrend::from_monthly_change(monthly_percent),
        monthly_change: change(previous.value, current.value),
        six_month_change: change(oldest.value, current.value),
        history,
        trend_definitions: TREND_DEFINITIONS,
    }
}

/// Advice for a Fear & Greed reading given the liquidity direction.
pub fn market_advice(fear_greed: u8, liquidity: LiquidityTrend) -> &'static str {
    let easing = liquidity.is_increasing();
    match fear_greed {
        0..=25 if easing => {
            "Market is in extreme fear while liquidity is increasing. This could present buying opportunities as fear may be overblown with strong liquidity support."
        }
        0..=25 => {
            "Market is in extreme fear with tightening liquidity. Caution is advised, but extreme fear can present selective buying opportunities for long-term investors."
        }
        26..=45 if easing => {
            "Market sentiment is fearful despite improving liquidity conditions. This divergence may present opportunities in quality assets."
        }
        26..=45 => {
            "Market sentiment is fearful with tightening liquidity. Selective approach recommended with focus on assets with strong fundamentals."
        }
        46..=55 if easing => {
            "Market sentiment is neutral with improving liquidity. Conditions appear balanced with potential for upside if sentiment improves."
        }
        46..=55 => {
            "Market sentiment is neutral but liquidity is tightening. Consider balanced exposure with some defensive positioning."
        }
        56..=75 if easing => {
            "Market is showing greed with strong liquidity support. While momentum may continue, consider taking some profits and being selective with new positions."
        }
        56..=75 => {
            "Market is showing greed despite tightening liquidity. This divergence suggests caution and selective profit-taking may be prudent."
        }
        _ if easing => {
            "Market is in extreme greed with abundant liquidity. While this could fuel further gains, consider taking profits as valuations may be stretched."
        }
        _ => {
            "Market is in extreme greed despite tightening liquidity. This divergence is a warning sign - consider defensive positioning and taking profits."
        }
    }
}

/// Combine index readings (newest first) with the M2 series.
pub fn build_insights(entries: &[FearGreedEntry], today: NaiveDate) -> Result<MarketInsights> {
    let Some(latest) = entries.first() else {
        return Err(AnalyticsError::InsufficientData {
            required: 1,
            actual: 0,
        });
    };
    let m2 = m2_money_supply(today);

    Ok(MarketInsights {
        fear_and_greed: FearAndGreed {
            current: FearGreedReading {
                value: latest.value,
                classification: latest.classification.clone(),
                timestamp: latest.timestamp,
            },
            history: entries
                .iter()
                .take(FEAR_GREED_HISTORY as usize)
                .map(|entry| FearGreedHistoryItem {
                    value: entry.value,
                    classification: entry.classification.clone(),
                    date: entry.timestamp,
                })
                .collect(),
        },
        market_advice: market_advice(latest.value, m2.trend),
        m2_money_supply: m2,
    })
}

pub struct InsightsService {
    market: Arc<MarketService>,
}

impl InsightsService {
    pub fn new(market: Arc<MarketService>) -> Self {
        Self { market }
    }

    pub async fn insights(&self) -> Result<Envelope<MarketInsights>> {
        let readings = self.market.fear_greed(FEAR_GREED_HISTORY).await?;
        let today = Utc::now().date_naive();
        let Envelope {
            data,
            provenance,
            degraded,
            error,
            as_of,
        } = readings;

        let insights = build_insights(&data, today)?;
        Ok(Envelope {
            data: insights,
            provenance,
            degraded,
            error,
            as_of,
        })
    }
}
