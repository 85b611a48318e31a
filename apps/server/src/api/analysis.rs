use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use coinlens_analytics::{MarketInsights, SocialReport, TechnicalReport, TrendAnalysis};
use coinlens_market_data::Envelope;

use crate::{error::ApiResult, main_lib::AppState};

async fn trend_analysis(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<TrendAnalysis>>> {
    let analysis = state.trend_service.analyze().await?;
    Ok(Json(analysis))
}

async fn technical_analysis(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<TechnicalReport>>> {
    let report = state.technical_service.analyze().await?;
    Ok(Json(report))
}

async fn youtube_stats(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<SocialReport>>> {
    let stats = state.social_service.video_stats().await?;
    Ok(Json(stats))
}

async fn market_insights(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<MarketInsights>>> {
    let insights = state.insights_service.insights().await?;
    Ok(Json(insights))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trend-analysis", get(trend_analysis))
        .route("/technical-analysis", get(technical_analysis))
        .route("/youtube-stats", get(youtube_stats))
        .route("/market-insights", get(market_insights))
}
