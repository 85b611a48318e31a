use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use coinlens_analytics::market::CoinOption;
use coinlens_analytics::{Forecast, ForecastRequest, MarketService};
use coinlens_market_data::{Envelope, PricePoint};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(Deserialize)]
struct HistoryQuery {
    coin: Option<String>,
    days: Option<u32>,
}

async fn historical_data(
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<Vec<PricePoint>>>> {
    let coin = query
        .coin
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Coin parameter is required".to_string()))?;
    let history = state.market_service.historical(&coin, query.days).await?;
    Ok(Json(history))
}

async fn crypto_options() -> Json<Vec<CoinOption>> {
    Json(MarketService::prediction_options())
}

async fn train_predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> ApiResult<Json<Forecast>> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::BadRequest(format!("Missing or invalid data: {}", rejection.body_text()))
    })?;
    let forecast = state.forecaster.train_and_predict(request).await?;
    Ok(Json(forecast))
}

#[derive(Deserialize)]
struct ProgressQuery {
    coin: Option<String>,
}

/// Server-sent training progress, closed after the final epoch.
async fn training_progress(
    Query(query): Query<ProgressQuery>,
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let coin = query.coin.unwrap_or_else(|| "unknown".to_string());
    let stream = state
        .progress()
        .subscribe(&coin)
        .filter_map(|progress| async move {
            match SseEvent::default().json_data(progress) {
                Ok(event) => Some(Ok(event)),
                Err(err) => {
                    tracing::error!("Failed to serialize training progress: {}", err);
                    None
                }
            }
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ml/historical-data", get(historical_data))
        .route("/ml/crypto-options", get(crypto_options))
        .route("/ml/train-predict", post(train_predict))
        .route("/ml/training-progress", get(training_progress))
}
