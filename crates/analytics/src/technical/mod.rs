//! Simulated technical indicators: RSI, MACD, support/resistance and outlook.

mod technical_model;
mod technical_service;

pub use technical_model::*;
pub use technical_service::{
    coin_technicals, determine_outlook, format_price, prediction_text, rsi_status,
    simulate_macd, simulate_rsi, simulate_support_resistance, TechnicalService,
};

pub(crate) use technical_service::round_to;
