//! Synthetic forecasting: a simulated training loop with observable progress.

mod forecast_model;
mod forecast_service;
mod progress;

/// Epochs run by a default training loop.
pub const DEFAULT_EPOCHS: u32 = 10;

pub use forecast_model::*;
pub use forecast_service::{
    epoch_progress, model_summary, project, simulated_metrics, ForecastConfig, Forecaster,
    DEFAULT_HORIZON_DAYS, DEFAULT_LOOKBACK_WINDOW, MAX_HORIZON_DAYS, MIN_TRAINING_POINTS,
};
pub use progress::ProgressHub;
