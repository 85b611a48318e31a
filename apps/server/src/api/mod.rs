use std::sync::Arc;

use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::{config::Config, error::ApiError, main_lib::AppState};

pub mod analysis;
pub mod crypto;
pub mod health;
pub mod ml;
pub mod resources;

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allow.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any);
    }
    let origins = config
        .cors_allow
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect::<Vec<_>>();
    CorsLayer::new().allow_origin(origins)
}

async fn unknown_route() -> ApiError {
    ApiError::NotFound
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(crypto::router())
        .merge(analysis::router())
        .merge(resources::router())
        .merge(ml::router())
        .fallback(unknown_route);

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}
