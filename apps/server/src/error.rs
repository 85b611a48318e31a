use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coinlens_analytics::AnalyticsError;
use coinlens_market_data::{ClassifiedError, MarketDataError};
use serde::Serialize;
use thiserror::Error;

/// Failures that escape the data layer's fallback chain.
///
/// Upstream trouble normally arrives as degraded data, so anything here is a
/// bad request or an internal fault.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Not Found")]
    NotFound,
    #[error("{0}")]
    Analytics(#[from] AnalyticsError),
    #[error("No data available: {0}")]
    Data(#[from] ClassifiedError),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Analytics(e) => match e {
                AnalyticsError::InsufficientData { .. } | AnalyticsError::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                AnalyticsError::Data(_) | AnalyticsError::UnexpectedPayload { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
            },
            ApiError::Data(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", msg);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<MarketDataError> for ApiError {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::InvalidRequest(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
