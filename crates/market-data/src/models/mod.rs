//! Market data models
//!
//! - `resource` - Typed resource keys ([`Resource`]) and the per-call [`FetchRequest`]
//! - `market` - Normalised upstream shapes (markets, coin detail, trending, price series, Fear & Greed)
//! - `payload` - [`ResourceData`], [`Provenance`] and the [`Envelope`] every gateway call resolves to
//! - `catalog` - The static list of coins known without an upstream call

pub mod catalog;
mod market;
mod payload;
mod resource;

pub use catalog::{CatalogCoin, TOP_COINS};
pub use market::{
    fear_greed_classification, with_moving_average, CoinDetail, CoinLinks, FearGreedEntry,
    MarketCoin, PricePoint, TrendingCoin, MOVING_AVERAGE_WINDOW,
};
pub use payload::{Envelope, GatewayResponse, Provenance, ResourceData};
pub use resource::{
    FetchRequest, Resource, ResourceFamily, DEFAULT_HISTORY_DAYS, DEFAULT_PER_PAGE,
    MAX_HISTORY_DAYS, MAX_PER_PAGE,
};
