use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use coinlens_market_data::{Envelope, MarketCoin};
use rand::Rng;

use super::technical_model::{
    CoinTechnicals, Crossover, Direction, MacdReading, RsiReading, RsiStatus, Strength,
    SupportResistance, TechnicalIndicators, TechnicalOutlook, TechnicalReport,
};
use crate::errors::Result;
use crate::market::{MarketService, TOP_LIST_SIZE};

const DISCLAIMER: &str = "This technical analysis is simulated and for demonstration purposes only. In a production environment, this would use real historical data and proper technical analysis calculations.";

/// GBP conversion assumed when no GBP quote is known.
const GBP_PER_USD: f64 = 0.78;

/// Simulated RSI nudged by recent price changes.
///
/// Readings beyond 30/70 are compressed by half and the result stays within 5..=95.
pub fn simulate_rsi<R: Rng + ?Sized>(
    change_24h: Option<f64>,
    change_7d: Option<f64>,
    rng: &mut R,
) -> f64 {
    let noise = rng.gen_range(-5.0..5.0);
    compress_rsi(50.0 + change_24h.unwrap_or(0.0) * 1.2 + change_7d.unwrap_or(0.0) * 0.3 + noise)
}

fn compress_rsi(raw: f64) -> f64 {
    let compressed = if raw > 70.0 {
        70.0 + (raw - 70.0) * 0.5
    } else if raw < 30.0 {
        30.0 - (30.0 - raw) * 0.5
    } else {
        raw
    };
    compressed.clamp(5.0, 95.0)
}

pub fn rsi_status(value: f64) -> RsiStatus {
    if value >= 70.0 {
        RsiStatus::Overbought
    } else if value <= 30.0 {
        RsiStatus::Oversold
    } else {
        RsiStatus::Neutral
    }
}

fn rsi_description(status: RsiStatus) -> &'static str {
    match status {
        RsiStatus::Overbought => {
            "RSI indicates overbought conditions, suggesting potential price reversal or correction."
        }
        RsiStatus::Oversold => {
            "RSI indicates oversold conditions, suggesting potential price reversal or bounce."
        }
        RsiStatus::Neutral => "RSI is in neutral territory, neither overbought nor oversold.",
    }
}

/// Simulated MACD line, signal line and histogram, rounded to cents.
pub fn simulate_macd<R: Rng + ?Sized>(
    change_24h: Option<f64>,
    change_7d: Option<f64>,
    rng: &mut R,
) -> MacdReading {
    let (mut value, mut signal) = match (change_24h, change_7d) {
        (Some(day), Some(week)) => (day * 0.08, day * 0.03 + week * 0.05),
        _ => (rng.gen_range(-0.8..0.8), rng.gen_range(-0.8..0.8)),
    };
    value += rng.gen_range(-0.1..0.1);
    signal += rng.gen_range(-0.05..0.05);
    let histogram = value - signal;

    let trend = if value > 0.0 && histogram > 0.0 {
        Direction::Bullish
    } else if value < 0.0 && histogram < 0.0 {
        Direction::Bearish
    } else {
        Direction::Neutral
    };
    let crossover = if histogram.abs() < 0.05 {
        if histogram > 0.0 {
            Crossover::Bullish
        } else {
            Crossover::Bearish
        }
    } else {
        Crossover::None
    };

    MacdReading {
        value: round_to(value, 2),
        signal: round_to(signal, 2),
        histogram: round_to(histogram, 2),
        trend,
        crossover,
        description: macd_description(trend, crossover),
    }
}

fn macd_description(trend: Direction, crossover: Crossover) -> &'static str {
    match (crossover, trend) {
        (Crossover::Bullish, _) => {
            "MACD recently crossed above the signal line, suggesting bullish momentum."
        }
        (Crossover::Bearish, _) => {
            "MACD recently crossed below the signal line, suggesting bearish momentum."
        }
        (Crossover::None, Direction::Bullish) => {
            "MACD is above the signal line, indicating bullish momentum."
        }
        (Crossover::None, Direction::Bearish) => {
            "MACD is below the signal line, indicating bearish momentum."
        }
        (Crossover::None, Direction::Neutral) => "MACD is showing neutral momentum.",
    }
}

/// Two support and two resistance levels 3-10% apart, in USD and GBP.
///
/// Sub-dollar prices keep six decimals, everything else two.
pub fn simulate_support_resistance<R: Rng + ?Sized>(
    current_price: f64,
    gbp_price: f64,
    rng: &mut R,
) -> SupportResistance {
    let price = if current_price > 0.0 { current_price } else { 100.0 };
    let gbp = if gbp_price > 0.0 { gbp_price } else { price * GBP_PER_USD };
    let rate = gbp / price;
    let decimals = if price < 1.0 { 6 } else { 2 };

    let volatility = rng.gen_range(0.03..0.10);
    let mut step = || volatility * rng.gen_range(0.5..1.0);
    let support1 = price * (1.0 - step());
    let support2 = support1 * (1.0 - step());
    let resistance1 = price * (1.0 + step());
    let resistance2 = resistance1 * (1.0 + step());

    let levels = [
        ("support1", support1),
        ("support2", support2),
        ("resistance1", resistance1),
        ("resistance2", resistance2),
    ];
    let (nearest_type, nearest) = levels
        .iter()
        .copied()
        .min_by(|a, b| (price - a.1).abs().total_cmp(&(price - b.1).abs()))
        .unwrap_or(("support1", support1));

    let round = |value: f64| round_to(value, decimals);
    SupportResistance {
        support1: round(support1),
        support2: round(support2),
        resistance1: round(resistance1),
        resistance2: round(resistance2),
        nearest_level: round(nearest),
        nearest_level_gbp: round(nearest * rate),
        nearest_type: nearest_type.to_string(),
        support1_gbp: round(support1 * rate),
        support2_gbp: round(support2 * rate),
        resistance1_gbp: round(resistance1 * rate),
        resistance2_gbp: round(resistance2 * rate),
    }
}

/// Weigh RSI, MACD and the last day's move into an outlook.
pub fn determine_outlook(
    rsi: f64,
    macd: &MacdReading,
    change_24h: Option<f64>,
) -> (Direction, Strength, &'static str) {
    let mut bullish = 0.0;
    let mut bearish = 0.0;

    if rsi <= 30.0 {
        bullish += 1.0;
    } else if rsi >= 70.0 {
        bearish += 1.0;
    }
    match macd.trend {
        Direction::Bullish => bullish += 1.0,
        Direction::Bearish => bearish += 1.0,
        Direction::Neutral => {}
    }
    match macd.crossover {
        Crossover::Bullish => bullish += 1.0,
        Crossover::Bearish => bearish += 1.0,
        Crossover::None => {}
    }
    match change_24h {
        Some(change) if change > 0.0 => bullish += 0.5,
        Some(change) if change < 0.0 => bearish += 0.5,
        _ => {}
    }

    if bullish > bearish + 1.0 {
        if bullish > bearish + 2.0 {
            (
                Direction::Bullish,
                Strength::Strong,
                "Multiple technical indicators are showing strong bullish signals.",
            )
        } else {
            (
                Direction::Bullish,
                Strength::Weak,
                "Technical indicators are leaning bullish, but with moderate strength.",
            )
        }
    } else if bearish > bullish + 1.0 {
        if bearish > bullish + 2.0 {
            (
                Direction::Bearish,
                Strength::Strong,
                "Multiple technical indicators are showing strong bearish signals.",
            )
        } else {
            (
                Direction::Bearish,
                Strength::Weak,
                "Technical indicators are leaning bearish, but with moderate strength.",
            )
        }
    } else {
        (
            Direction::Neutral,
            Strength::Weak,
            "Technical indicators are showing mixed signals.",
        )
    }
}

/// Short-term narrative for a coin. Uses the first word of `name`.
pub fn prediction_text(
    name: &str,
    rsi: f64,
    macd: &MacdReading,
    levels: &SupportResistance,
    outlook: Direction,
    strength: Strength,
    current_price: f64,
) -> String {
    let symbol = name.split_whitespace().next().unwrap_or(name);
    let support = format_price(levels.support1);
    let resistance = format_price(levels.resistance1);

    match (outlook, strength) {
        (Direction::Bullish, Strength::Strong) => {
            let gain = percent_change(current_price, levels.resistance1);
            format!(
                "{} is showing strong bullish momentum with positive RSI and MACD readings. Price could test resistance at ${} ({:.1}% gain) in the short term.",
                symbol, resistance, gain
            )
        }
        (Direction::Bullish, Strength::Weak) => format!(
            "{} is showing moderate bullish signals but may face resistance near ${}. Watch for continued momentum in MACD to confirm uptrend.",
            symbol, resistance
        ),
        (Direction::Bearish, Strength::Strong) => {
            let loss = -percent_change(current_price, levels.support1);
            format!(
                "{} is showing strong bearish momentum with negative technical indicators. Price could test support at ${} ({:.1}% drop) if selling pressure continues.",
                symbol, support, loss
            )
        }
        (Direction::Bearish, Strength::Weak) => format!(
            "{} is showing moderate bearish signals and may find support near ${}. Monitor RSI for potential oversold conditions that could trigger a bounce.",
            symbol, support
        ),
        (Direction::Neutral, _) if rsi > 50.0 && macd.histogram > 0.0 => format!(
            "{} is consolidating with slightly positive bias. Price is likely to trade between ${} and ${} in the near term.",
            symbol, support, resistance
        ),
        (Direction::Neutral, _) if rsi < 50.0 && macd.histogram < 0.0 => format!(
            "{} is consolidating with slightly negative bias. Watch for a break below ${} which could accelerate selling.",
            symbol, support
        ),
        (Direction::Neutral, _) => format!(
            "{} is showing mixed signals and may continue to trade sideways. Key levels to watch are ${} and ${}.",
            symbol, support, resistance
        ),
    }
}

fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from) / from * 100.0
    }
}

/// Price with thousands separators above 1000, six decimals below 1.
pub fn format_price(price: f64) -> String {
    if price >= 1000.0 {
        let fixed = format!("{:.2}", price);
        let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }
        format!("{}.{}", grouped, fraction)
    } else if price >= 1.0 {
        format!("{:.2}", price)
    } else {
        format!("{:.6}", price)
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Full indicator set for one coin.
pub fn coin_technicals<R: Rng + ?Sized>(
    coin: &MarketCoin,
    gbp_price: f64,
    rng: &mut R,
) -> CoinTechnicals {
    let change_24h = coin.price_change_percentage_24h;
    let change_7d = coin.price_change_percentage_7d;

    let rsi = simulate_rsi(change_24h, change_7d, rng);
    let status = rsi_status(rsi);
    let macd = simulate_macd(change_24h, change_7d, rng);
    let levels = simulate_support_resistance(coin.current_price, gbp_price, rng);
    let (outlook, strength, description) = determine_outlook(rsi, &macd, change_24h);
    let prediction = prediction_text(
        &coin.name,
        rsi,
        &macd,
        &levels,
        outlook,
        strength,
        coin.current_price,
    );

    CoinTechnicals {
        id: coin.id.clone(),
        name: coin.name.clone(),
        symbol: coin.symbol.clone(),
        image: coin.image.clone(),
        current_price: coin.current_price,
        gbp_price,
        price_change_24h: change_24h,
        market_cap_rank: coin.market_cap_rank,
        technical_indicators: TechnicalIndicators {
            rsi: RsiReading {
                value: rsi,
                status,
                description: rsi_description(status),
            },
            macd,
            support_resistance: levels,
            technical_outlook: TechnicalOutlook {
                outlook,
                strength,
                description,
                prediction,
            },
        },
    }
}

pub struct TechnicalService {
    market: Arc<MarketService>,
}

impl TechnicalService {
    pub fn new(market: Arc<MarketService>) -> Self {
        Self { market }
    }

    /// Indicators for the top 20 coins.
    pub async fn analyze(&self) -> Result<Envelope<TechnicalReport>> {
        let usd = self.market.markets("usd", TOP_LIST_SIZE).await?;
        let gbp = self.market.markets("gbp", TOP_LIST_SIZE).await?;
        let simulation = Arc::clone(self.market.simulation());

        Ok(usd.combine(gbp, |usd, gbp| {
            let gbp_prices: HashMap<&str, f64> = gbp
                .iter()
                .map(|coin| (coin.id.as_str(), coin.current_price))
                .collect();
            let data = simulation.with(|rng| {
                usd.iter()
                    .map(|coin| {
                        let gbp_price = gbp_prices.get(coin.id.as_str()).copied().unwrap_or(0.0);
                        coin_technicals(coin, gbp_price, rng)
                    })
                    .collect()
            });
            TechnicalReport {
                timestamp: Utc::now(),
                data,
                disclaimer: DISCLAIMER,
            }
        }))
    }
}
