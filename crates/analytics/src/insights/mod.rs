//! Fear & Greed index combined with a simulated M2 liquidity series.

mod insights_model;
mod insights_service;

pub use insights_model::*;
pub use insights_service::{
    build_insights, m2_history, m2_money_supply, market_advice, InsightsService,
    FEAR_GREED_HISTORY,
};
