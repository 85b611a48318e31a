//! Simulated per-coin sentiment report.
//!
//! Nothing here reads upstream data: every figure derives from one random
//! overall score so the parts of a report agree with each other.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;

const TREND_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentReport {
    pub coin_id: String,
    pub overall_score: u8,
    pub social_media_sentiment: SocialMediaSentiment,
    pub news_sentiment: NewsSentimentSplit,
    pub keyword_analysis: Vec<KeywordCount>,
    pub sentiment_trend: Vec<SentimentPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialMediaSentiment {
    pub twitter: f64,
    pub reddit: f64,
    pub telegram: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsSentimentSplit {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordCount {
    pub keyword: &'static str,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentPoint {
    pub date: NaiveDate,
    pub score: f64,
}

/// Build a report for `coin_id` whose 7-day trend ends on `today`.
pub fn sentiment_report<R: Rng + ?Sized>(
    coin_id: &str,
    today: NaiveDate,
    rng: &mut R,
) -> SentimentReport {
    let base: u8 = rng.gen_range(0..100);
    let score = f64::from(base);
    let inverse = 100 - u32::from(base);
    let base = u32::from(base);

    let mut channel = || (score * rng.gen_range(0.8..1.2)).clamp(0.0, 100.0);
    let social_media_sentiment = SocialMediaSentiment {
        twitter: channel(),
        reddit: channel(),
        telegram: channel(),
    };

    let news_sentiment = NewsSentimentSplit {
        positive: if base > 50 { score / 100.0 } else { 0.3 },
        neutral: 0.2,
        negative: if base < 50 { f64::from(inverse) / 100.0 } else { 0.1 },
    };

    let keyword_analysis = vec![
        KeywordCount { keyword: "bullish", count: base / 10 },
        KeywordCount { keyword: "bearish", count: inverse / 10 },
        KeywordCount { keyword: "growth", count: base / 15 },
        KeywordCount { keyword: "dump", count: inverse / 15 },
        KeywordCount { keyword: "potential", count: base / 20 },
    ];

    let sentiment_trend = (0..TREND_DAYS)
        .map(|i| {
            // Weight moves from a random historical value to today's score
            let weight = i as f64 / (TREND_DAYS - 1) as f64;
            let variation = rng.gen_range(-10.0..10.0);
            let historical = rng.gen_range(0.0..100.0);
            let trended = historical * (1.0 - weight) + score * weight + variation * (1.0 - weight);
            SentimentPoint {
                date: today - Duration::days(TREND_DAYS - 1 - i),
                score: trended.clamp(0.0, 100.0),
            }
        })
        .collect();

    SentimentReport {
        coin_id: coin_id.to_string(),
        overall_score: base as u8,
        social_media_sentiment,
        news_sentiment,
        keyword_analysis,
        sentiment_trend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_report_is_internally_consistent() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        for seed in 0..20 {
            let report = sentiment_report("bitcoin", today, &mut StdRng::seed_from_u64(seed));
            let score = f64::from(report.overall_score);

            assert!(report.overall_score < 100);
            let social = &report.social_media_sentiment;
            for value in [social.twitter, social.reddit, social.telegram] {
                assert!(value >= score * 0.8 - 1e-9 && value <= (score * 1.2).min(100.0));
            }
            assert_eq!(report.keyword_analysis[0].count, u32::from(report.overall_score) / 10);
            assert_eq!(report.news_sentiment.neutral, 0.2);
        }
    }

    #[test]
    fn test_trend_converges_on_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let report = sentiment_report("solana", today, &mut StdRng::seed_from_u64(3));

        let trend = &report.sentiment_trend;
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2024, 5, 11).unwrap());
        assert_eq!(trend[6].date, today);
        assert_eq!(trend[6].score, f64::from(report.overall_score));
    }
}
