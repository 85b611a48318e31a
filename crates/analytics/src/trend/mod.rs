//! Momentum scan: potential pumps and drops, trending coins and news mentions.

mod trend_model;
mod trend_service;

pub use trend_model::*;
pub use trend_service::{analyze, is_potential_drop, is_potential_pump, TrendService};
