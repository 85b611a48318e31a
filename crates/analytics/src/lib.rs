//! CoinLens Analytics Crate
//!
//! Dashboard views derived from [`coinlens_market_data`] responses. Most
//! figures are simulated from a shared, seedable [`Simulation`]; every view
//! that reads gateway data returns an [`Envelope`](coinlens_market_data::Envelope)
//! carrying the weakest provenance of its inputs.
//!
//! - `market` - Market list, coin overview, trending list, history, prediction options
//! - `trend` - Potential pumps and drops, trending signals
//! - `technical` - RSI, MACD, support/resistance and outlook
//! - `sentiment` - Per-coin sentiment report
//! - `social` - Video popularity metrics
//! - `insights` - Fear & Greed with M2 liquidity and advice
//! - `forecast` - Simulated training loop, predictions and progress streaming

pub mod errors;
pub mod forecast;
pub mod insights;
pub mod market;
pub mod sentiment;
pub mod simulation;
pub mod social;
pub mod technical;
pub mod trend;

#[cfg(test)]
mod testing;

pub use errors::{AnalyticsError, Result};
pub use forecast::{Forecast, ForecastRequest, Forecaster, ProgressHub, TrainingProgress};
pub use insights::{InsightsService, MarketInsights};
pub use market::MarketService;
pub use sentiment::{sentiment_report, SentimentReport};
pub use simulation::Simulation;
pub use social::{SocialReport, SocialService};
pub use technical::{TechnicalReport, TechnicalService};
pub use trend::{TrendAnalysis, TrendService};
