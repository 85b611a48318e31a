//! Market listings, coin detail, trending and history.

mod market_model;
mod market_service;

pub use market_model::*;
pub use market_service::{MarketService, SCAN_SIZE, TOP_LIST_SIZE};
