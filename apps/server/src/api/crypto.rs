use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use coinlens_analytics::market::{CoinOverview, MarketListing, TrendingListing};
use coinlens_analytics::{sentiment_report, SentimentReport};
use coinlens_market_data::Envelope;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

async fn list_markets(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<Vec<MarketListing>>>> {
    let markets = state.market_service.list_markets().await?;
    Ok(Json(markets))
}

async fn trending(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<Vec<TrendingListing>>>> {
    let trending = state.market_service.trending().await?;
    Ok(Json(trending))
}

async fn coin_overview(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<CoinOverview>>> {
    let overview = state.market_service.coin_overview(&id).await?;
    Ok(Json(overview))
}

/// Fully simulated; never touches the gateway.
async fn coin_sentiment(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SentimentReport>> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::BadRequest("Coin id is required".to_string()));
    }
    let today = Utc::now().date_naive();
    let report = state.simulation.with(|rng| sentiment_report(id, today, rng));
    Ok(Json(report))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/crypto", get(list_markets))
        .route("/crypto/trending", get(trending))
        .route("/crypto/{id}", get(coin_overview))
        .route("/crypto/{id}/sentiment", get(coin_sentiment))
}
