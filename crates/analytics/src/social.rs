//! Simulated video-platform popularity for the top coins.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use coinlens_market_data::{Envelope, MarketCoin};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::errors::Result;
use crate::market::{MarketService, TOP_LIST_SIZE};

const DISCLAIMER: &str = "This data is simulated and for demonstration purposes only. In a production environment, this would use the actual YouTube API.";

/// Rank assumed for coins without a market cap rank.
const UNRANKED: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub likes_ratio: f64,
    pub comment_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Growth {
    pub views_growth_percent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetrics {
    #[serde(rename = "videoCount24h")]
    pub video_count_24h: u64,
    #[serde(rename = "totalViews24h")]
    pub total_views_24h: u64,
    pub avg_views_per_video: u64,
    pub is_trending: bool,
    pub sentiment: f64,
    pub engagement: Engagement,
    pub growth: Growth,
    pub top_video_titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinVideoStats {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub market_cap_rank: Option<u32>,
    pub youtube_metrics: VideoMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialReport {
    pub timestamp: chrono::DateTime<Utc>,
    pub data: Vec<CoinVideoStats>,
    pub disclaimer: &'static str,
}

/// Simulated metrics for one coin. Higher ranked coins get more videos, views and optimism.
pub fn video_metrics<R: Rng + ?Sized>(coin: &MarketCoin, year: i32, rng: &mut R) -> VideoMetrics {
    let rank = coin.market_cap_rank.filter(|r| *r > 0).unwrap_or(UNRANKED);
    let rank_factor = 21u32.saturating_sub(rank).max(1) as f64;

    let video_count = (rank_factor * 15.0 * rng.gen_range(0.7..1.3)).floor() as u64;
    let avg_views = (500_000.0 / rank as f64 * rng.gen_range(0.8..1.2)).floor() as u64;
    let total_views = video_count * avg_views;
    let is_trending = video_count > 100 || avg_views > 100_000 || rng.gen::<f64>() > 0.8;

    let sentiment = (50.0 + rank_factor * 1.5 + rng.gen_range(-15.0..15.0)).clamp(20.0, 95.0);
    let likes_ratio = rng.gen_range(0.6..0.9);
    let comment_count = (total_views as f64 * rng.gen_range(0.002..0.005)).floor() as u64;
    let views_growth_percent = (rng.gen::<f64>() * 200.0 - 50.0).floor() as i64;

    VideoMetrics {
        video_count_24h: video_count,
        total_views_24h: total_views,
        avg_views_per_video: avg_views,
        is_trending,
        sentiment,
        engagement: Engagement {
            likes_ratio,
            comment_count,
        },
        growth: Growth {
            views_growth_percent,
        },
        top_video_titles: video_titles(&coin.name, &coin.symbol, sentiment, year, rng),
    }
}

/// Five shuffled titles whose tone follows `sentiment`.
pub fn video_titles<R: Rng + ?Sized>(
    name: &str,
    symbol: &str,
    sentiment: f64,
    year: i32,
    rng: &mut R,
) -> Vec<String> {
    let ticker = symbol.to_uppercase();
    let bullish = [
        format!("Why {} Will EXPLODE in {}! 🚀", name, year),
        format!("{} Price Prediction - $100K Soon?", ticker),
        format!("URGENT: {} Ready for MASSIVE Breakout!", name),
    ];
    let bearish = [
        format!("WARNING: {} Could CRASH - Sell Now?", name),
        format!("{} Price Analysis - Danger Ahead!", ticker),
        format!("Why I Sold All My {} - Red Flags Explained", name),
    ];
    let neutral = [
        format!("{} Complete Guide {} - Everything You Need to Know", name, year),
        format!("{} vs Competitors - Detailed Comparison", ticker),
        format!("{} Technical Analysis - Key Levels to Watch", name),
    ];

    let [n0, n1, n2] = neutral;
    let mut titles = if sentiment > 70.0 {
        let [b0, b1, b2] = bullish;
        vec![b0, b1, b2, n0, n1]
    } else if sentiment < 40.0 {
        let [b0, b1, b2] = bearish;
        vec![b0, b1, b2, n0, n1]
    } else {
        let [up, ..] = bullish;
        let [down, ..] = bearish;
        vec![n0, n1, up, down, n2]
    };
    titles.shuffle(rng);
    titles
}

pub struct SocialService {
    market: Arc<MarketService>,
}

impl SocialService {
    pub fn new(market: Arc<MarketService>) -> Self {
        Self { market }
    }

    /// Video stats for the top coins, most viewed first.
    pub async fn video_stats(&self) -> Result<Envelope<SocialReport>> {
        let markets = self.market.markets("usd", TOP_LIST_SIZE).await?;
        let simulation = Arc::clone(self.market.simulation());
        let now = Utc::now();

        Ok(markets.map(|coins| {
            let mut data: Vec<CoinVideoStats> = simulation.with(|rng| {
                coins
                    .into_iter()
                    .map(|coin| {
                        let youtube_metrics = video_metrics(&coin, now.year(), rng);
                        CoinVideoStats {
                            id: coin.id,
                            name: coin.name,
                            symbol: coin.symbol,
                            image: coin.image,
                            market_cap_rank: coin.market_cap_rank,
                            youtube_metrics,
                        }
                    })
                    .collect()
            });
            data.sort_by(|a, b| {
                b.youtube_metrics
                    .total_views_24h
                    .cmp(&a.youtube_metrics.total_views_24h)
            });
            SocialReport {
                timestamp: now,
                data,
                disclaimer: DISCLAIMER,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{market_coin, service_with, Fixture};
    use coinlens_market_data::Provenance;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ranked(rank: Option<u32>) -> MarketCoin {
        let mut coin = market_coin("bitcoin", 60_000.0, 0.05, 0.0, 0.0);
        coin.market_cap_rank = rank;
        coin
    }

    #[test]
    fn test_metrics_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for rank in [Some(1), Some(10), Some(20), Some(250), None] {
            let metrics = video_metrics(&ranked(rank), 2026, &mut rng);
            assert!((20.0..=95.0).contains(&metrics.sentiment));
            assert!((0.6..0.9).contains(&metrics.engagement.likes_ratio));
            assert!((-50..150).contains(&metrics.growth.views_growth_percent));
            assert_eq!(
                metrics.total_views_24h,
                metrics.video_count_24h * metrics.avg_views_per_video
            );
            assert_eq!(metrics.top_video_titles.len(), 5);
        }
    }

    #[test]
    fn test_top_coin_always_trends() {
        let mut rng = StdRng::seed_from_u64(12);
        let metrics = video_metrics(&ranked(Some(1)), 2026, &mut rng);
        // 20 * 15 * 0.7 videos at least, 400k views each
        assert!(metrics.video_count_24h >= 210);
        assert!(metrics.avg_views_per_video >= 400_000);
        assert!(metrics.is_trending);
    }

    #[test]
    fn test_titles_follow_sentiment() {
        let mut rng = StdRng::seed_from_u64(13);
        let bullish = video_titles("Bitcoin", "btc", 80.0, 2026, &mut rng);
        assert!(bullish.iter().any(|t| t == "Why Bitcoin Will EXPLODE in 2026! 🚀"));
        assert!(!bullish.iter().any(|t| t.starts_with("WARNING")));

        let bearish = video_titles("Bitcoin", "btc", 30.0, 2026, &mut rng);
        assert!(bearish.iter().any(|t| t == "BTC Price Analysis - Danger Ahead!"));
        assert!(!bearish.iter().any(|t| t.contains("EXPLODE")));

        let mixed = video_titles("Bitcoin", "btc", 55.0, 2026, &mut rng);
        assert!(mixed.iter().any(|t| t.contains("EXPLODE")));
        assert!(mixed.iter().any(|t| t.starts_with("WARNING")));
        assert!(mixed.iter().any(|t| t == "Bitcoin Technical Analysis - Key Levels to Watch"));
    }

    #[tokio::test]
    async fn test_stats_sorted_by_views() {
        let service = SocialService::new(service_with(Fixture::live()));
        let report = service.video_stats().await.unwrap();

        assert_eq!(report.provenance, Provenance::Live);
        let views: Vec<u64> = report
            .data
            .data
            .iter()
            .map(|c| c.youtube_metrics.total_views_24h)
            .collect();
        assert_eq!(views.len(), 3);
        assert!(views.windows(2).all(|w| w[0] >= w[1]));

        let json = serde_json::to_value(&report.data.data[0]).unwrap();
        assert!(json["youtubeMetrics"]["videoCount24h"].is_u64());
        assert!(json["youtubeMetrics"]["engagement"]["likesRatio"].is_f64());
    }
}
