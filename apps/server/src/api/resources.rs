use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use coinlens_market_data::{FetchRequest, GatewayResponse, Resource};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(Deserialize)]
struct ResourceQuery {
    key: Option<String>,
    #[serde(default)]
    attempt: u32,
}

/// Raw gateway access by resource key, e.g. `historical:bitcoin:60`.
async fn get_resource(
    Query(query): Query<ResourceQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<GatewayResponse>> {
    let key = query
        .key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'key' is required".to_string()))?;
    let resource = Resource::parse(&key)?;
    let request = FetchRequest::new(resource).with_attempt(query.attempt);
    let response = state.gateway.fetch(&request).await?;
    Ok(Json(response))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/resources", get(get_resource))
}
