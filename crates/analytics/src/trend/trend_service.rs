use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use coinlens_market_data::{Envelope, MarketCoin, Provenance, TrendingCoin};
use log::debug;
use rand::Rng;

use super::trend_model::{MomentumSignal, NewsMention, TrendAnalysis, TrendingSignal};
use crate::errors::Result;
use crate::market::{MarketService, SCAN_SIZE};

const MAX_SIGNALS: usize = 5;
const MAX_TRENDING: usize = 7;
/// GBP estimate used when no GBP quote is available.
const GBP_PER_USD: f64 = 0.8;
/// Rank assumed for trending coins without one.
const UNRANKED: u32 = 100;

const DISCLAIMER: &str = "This analysis is based on historical data and current trends. It should not be considered as financial advice. Always do your own research before making investment decisions.";

const PUMP_SIGNALS: [&str; 3] = [
    "Strong recent momentum",
    "High trading volume",
    "Positive price trend",
];
const DROP_SIGNALS: [&str; 3] = [
    "Downward momentum",
    "High selling volume",
    "Negative price trend",
];
const TRENDING_SIGNALS: [&str; 3] = [
    "High social volume",
    "Trending on CoinGecko",
    "Community growth",
];
const TOP_COIN_SIGNALS: [&str; 3] = ["Popular cryptocurrency", "High market cap", "Active trading"];

static NEWS_MENTIONS: [NewsMention; 5] = [
    NewsMention {
        id: "bitcoin",
        name: "Bitcoin",
        symbol: "BTC",
        image: "https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
        mentions: 342,
        sentiment: 0.65,
        headlines: [
            "Bitcoin ETF sees record inflows as institutional interest grows",
            "Major bank announces Bitcoin custody solution",
        ],
    },
    NewsMention {
        id: "ethereum",
        name: "Ethereum",
        symbol: "ETH",
        image: "https://assets.coingecko.com/coins/images/279/large/ethereum.png",
        mentions: 287,
        sentiment: 0.72,
        headlines: [
            "Ethereum upgrade scheduled for next month",
            "DeFi growth continues to drive Ethereum adoption",
        ],
    },
    NewsMention {
        id: "solana",
        name: "Solana",
        symbol: "SOL",
        image: "https://assets.coingecko.com/coins/images/4128/large/solana.png",
        mentions: 156,
        sentiment: 0.58,
        headlines: [
            "Solana NFT marketplace sees record volume",
            "New DeFi protocol launches on Solana",
        ],
    },
    NewsMention {
        id: "cardano",
        name: "Cardano",
        symbol: "ADA",
        image: "https://assets.coingecko.com/coins/images/975/large/cardano.png",
        mentions: 98,
        sentiment: 0.51,
        headlines: [
            "Cardano announces new partnership",
            "Development activity increases on Cardano",
        ],
    },
    NewsMention {
        id: "ripple",
        name: "XRP",
        symbol: "XRP",
        image: "https://assets.coingecko.com/coins/images/44/large/xrp-symbol-white-128.png",
        mentions: 76,
        sentiment: 0.48,
        headlines: ["XRP lawsuit developments", "New exchange listings for XRP"],
    },
];

/// Strong positive momentum on heavy volume.
pub fn is_potential_pump(coin: &MarketCoin) -> bool {
    let hour = coin.price_change_percentage_1h.unwrap_or(0.0);
    let day = coin.price_change_percentage_24h.unwrap_or(0.0);
    let week = coin.price_change_percentage_7d.unwrap_or(0.0);
    hour > 3.0 && day > 0.0 && week > -5.0 && coin.volume_to_market_cap() > 0.1
}

/// Strong negative momentum on heavy volume.
pub fn is_potential_drop(coin: &MarketCoin) -> bool {
    let hour = coin.price_change_percentage_1h.unwrap_or(0.0);
    let day = coin.price_change_percentage_24h.unwrap_or(0.0);
    hour < -3.0 && day < 0.0 && coin.volume_to_market_cap() > 0.1
}

/// Scan a USD snapshot for momentum and assemble the trend report.
///
/// `gbp` maps coin ids to GBP prices; missing entries are estimated from USD.
/// With no `trending` list the top coins of the snapshot stand in.
pub fn analyze<R: Rng + ?Sized>(
    usd: &[MarketCoin],
    gbp: Option<&HashMap<String, f64>>,
    trending: Option<&[TrendingCoin]>,
    rng: &mut R,
) -> TrendAnalysis {
    let gbp_price = |coin: &MarketCoin| {
        gbp.and_then(|prices| prices.get(&coin.id).copied())
            .unwrap_or(coin.current_price * GBP_PER_USD)
    };

    let potential_pumps = usd
        .iter()
        .filter(|coin| is_potential_pump(coin))
        .take(MAX_SIGNALS)
        .map(|coin| MomentumSignal {
            recent_mentions: rng.gen_range(50..150),
            trending_rank: rng.gen_range(0..20),
            ..momentum(coin, gbp_price(coin), &PUMP_SIGNALS)
        })
        .collect();

    let potential_drops = usd
        .iter()
        .filter(|coin| is_potential_drop(coin))
        .take(MAX_SIGNALS)
        .map(|coin| MomentumSignal {
            recent_mentions: rng.gen_range(20..120),
            trending_rank: rng.gen_range(20..70),
            ..momentum(coin, gbp_price(coin), &DROP_SIGNALS)
        })
        .collect();

    let trending_coins = match trending.filter(|coins| !coins.is_empty()) {
        Some(coins) => coins
            .iter()
            .take(MAX_TRENDING)
            .map(|coin| {
                let price = 10_000.0 / f64::from(coin.market_cap_rank.unwrap_or(UNRANKED).max(1));
                TrendingSignal {
                    id: coin.id.clone(),
                    name: coin.name.clone(),
                    symbol: coin.symbol.clone(),
                    image: coin.image.clone(),
                    market_cap_rank: coin.market_cap_rank,
                    price,
                    gbp_price: price * GBP_PER_USD,
                    signals: TRENDING_SIGNALS.to_vec(),
                    score: rng.gen_range(1..=100),
                }
            })
            .collect(),
        None => {
            debug!("No trending list, using top coins");
            usd.iter()
                .take(MAX_TRENDING)
                .map(|coin| TrendingSignal {
                    id: coin.id.clone(),
                    name: coin.name.clone(),
                    symbol: coin.symbol.clone(),
                    image: coin.image.clone(),
                    market_cap_rank: coin.market_cap_rank,
                    price: coin.current_price,
                    gbp_price: gbp_price(coin),
                    signals: TOP_COIN_SIGNALS.to_vec(),
                    score: rng.gen_range(1..=100),
                })
                .collect()
        }
    };

    TrendAnalysis {
        timestamp: Utc::now(),
        potential_pumps,
        potential_drops,
        trending_coins,
        top_news_mentions: NEWS_MENTIONS.to_vec(),
        disclaimer: DISCLAIMER,
    }
}

fn momentum(coin: &MarketCoin, gbp_price: f64, signals: &[&'static str]) -> MomentumSignal {
    MomentumSignal {
        id: coin.id.clone(),
        name: coin.name.clone(),
        symbol: coin.symbol.clone(),
        image: coin.image.clone(),
        current_price: coin.current_price,
        gbp_price,
        price_change_1h: coin.price_change_percentage_1h,
        price_change_24h: coin.price_change_percentage_24h,
        price_change_7d: coin.price_change_percentage_7d,
        volume: coin.total_volume,
        volume_to_market_cap: coin.volume_to_market_cap(),
        signals: signals.to_vec(),
        recent_mentions: 0,
        trending_rank: 0,
    }
}

pub struct TrendService {
    market: Arc<MarketService>,
}

impl TrendService {
    pub fn new(market: Arc<MarketService>) -> Self {
        Self { market }
    }

    /// Momentum scan over the top 100 coins.
    ///
    /// Synthetic GBP quotes and trending lists are not used: GBP is estimated
    /// from USD and the top coins replace trending.
    pub async fn analyze(&self) -> Result<Envelope<TrendAnalysis>> {
        let usd = self.market.markets("usd", SCAN_SIZE).await?;
        let gbp = self.market.markets("gbp", SCAN_SIZE).await?;
        let trending = self.market.trending_coins().await?;

        let gbp = gbp.map_with_provenance(|coins, provenance| {
            (provenance != Provenance::Synthetic).then(|| {
                coins
                    .into_iter()
                    .map(|coin| (coin.id, coin.current_price))
                    .collect::<HashMap<_, _>>()
            })
        });
        let trending = trending.map_with_provenance(|coins, provenance| {
            (provenance != Provenance::Synthetic).then_some(coins)
        });

        let simulation = Arc::clone(self.market.simulation());
        Ok(usd
            .combine(gbp, |usd, gbp| (usd, gbp))
            .combine(trending, |(usd, gbp), trending| {
                simulation.with(|rng| analyze(&usd, gbp.as_ref(), trending.as_deref(), rng))
            }))
    }
}
