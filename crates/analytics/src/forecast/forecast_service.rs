use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use rand::Rng;

use super::forecast_model::{
    Forecast, ForecastMetrics, ForecastRequest, Prediction, TrainingProgress,
};
use super::progress::ProgressHub;
use super::DEFAULT_EPOCHS;
use crate::errors::{AnalyticsError, Result};
use crate::simulation::Simulation;

pub const MIN_TRAINING_POINTS: usize = 30;
pub const DEFAULT_LOOKBACK_WINDOW: u32 = 14;
pub const DEFAULT_HORIZON_DAYS: u32 = 7;
/// Longest horizon accepted.
pub const MAX_HORIZON_DAYS: u32 = 365;

#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub epochs: u32,
    /// Pause per simulated epoch so progress is observable.
    pub epoch_delay: Duration,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_EPOCHS,
            epoch_delay: Duration::from_millis(500),
        }
    }
}

/// Simulated loss and accuracy after `epoch` (1-based). Accuracy never exceeds 1.
pub fn epoch_progress<R: Rng + ?Sized>(
    epoch: u32,
    total_epochs: u32,
    rng: &mut R,
) -> TrainingProgress {
    let decay = 0.5 * 0.85f64.powi(epoch as i32);
    TrainingProgress {
        epoch,
        total_epochs,
        loss: decay + rng.gen::<f64>() * 0.02,
        accuracy: (1.0 - decay + rng.gen::<f64>() * 0.05).min(1.0),
    }
}

/// Random walk of at most 3% per day from `last_price`, with a band widening by `sqrt(day)`.
pub fn project<R: Rng + ?Sized>(
    last_price: f64,
    horizon_days: u32,
    rng: &mut R,
) -> Vec<Prediction> {
    let mut predicted = last_price;
    (1..=horizon_days)
        .map(|day| {
            predicted *= 1.0 + rng.gen_range(-0.03..0.03);
            let band = 0.02 * (day as f64).sqrt();
            Prediction {
                predicted,
                upper_bound: predicted * (1.0 + band),
                lower_bound: predicted * (1.0 - band),
            }
        })
        .collect()
}

pub fn simulated_metrics<R: Rng + ?Sized>(last_price: f64, rng: &mut R) -> ForecastMetrics {
    let mae = last_price * rng.gen_range(0.02..0.05);
    ForecastMetrics {
        mae,
        rmse: mae * (1.0 + rng.gen::<f64>() * 0.5),
        r2: 0.6 + rng.gen::<f64>() * 0.3,
    }
}

pub fn model_summary(lookback_window: u32) -> String {
    format!(
        "LSTM Neural Network Architecture:
- Input layer: {} time steps
- LSTM layer: 64 units, activation=tanh
- Dropout layer: rate=0.2
- LSTM layer: 32 units, activation=tanh
- Dropout layer: rate=0.2
- Dense layer: 16 units, activation=relu
- Output layer: 1 unit, activation=linear

Total params: 25,361
Trainable params: 25,361
Non-trainable params: 0",
        lookback_window
    )
}

/// Runs the simulated training loop and produces a forecast.
pub struct Forecaster {
    config: ForecastConfig,
    progress: Arc<ProgressHub>,
    simulation: Arc<Simulation>,
}

impl Forecaster {
    pub fn new(progress: Arc<ProgressHub>, simulation: Arc<Simulation>) -> Self {
        Self::with_config(ForecastConfig::default(), progress, simulation)
    }

    pub fn with_config(
        config: ForecastConfig,
        progress: Arc<ProgressHub>,
        simulation: Arc<Simulation>,
    ) -> Self {
        Self {
            config,
            progress,
            simulation,
        }
    }

    pub fn progress(&self) -> &Arc<ProgressHub> {
        &self.progress
    }

    /// Validate the request, publish one progress update per epoch and return predictions.
    pub async fn train_and_predict(&self, request: ForecastRequest) -> Result<Forecast> {
        let series_id = request.series_id.trim();
        if series_id.is_empty() {
            return Err(AnalyticsError::InvalidInput("series id is required".to_string()));
        }
        let points = &request.historical_points;
        if points.len() < MIN_TRAINING_POINTS {
            return Err(AnalyticsError::InsufficientData {
                required: MIN_TRAINING_POINTS,
                actual: points.len(),
            });
        }
        if let Some(bad) = points.iter().find(|p| !p.price.is_finite() || p.price < 0.0) {
            return Err(AnalyticsError::InvalidInput(format!(
                "invalid price {} at {}",
                bad.price, bad.timestamp
            )));
        }
        let lookback = request.lookback_window.unwrap_or(DEFAULT_LOOKBACK_WINDOW).max(1);
        let horizon = request.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS);
        if horizon == 0 || horizon > MAX_HORIZON_DAYS {
            return Err(AnalyticsError::InvalidInput(format!(
                "horizon must be between 1 and {} days",
                MAX_HORIZON_DAYS
            )));
        }

        info!(
            "Training forecast model for '{}' with {} points (lookback {}, horizon {})",
            series_id,
            points.len(),
            lookback,
            horizon
        );

        let total = self.config.epochs;
        self.progress.publish(series_id, TrainingProgress::starting(total));
        for epoch in 1..=total {
            tokio::time::sleep(self.config.epoch_delay).await;
            let progress = self.simulation.with(|rng| epoch_progress(epoch, total, rng));
            debug!(
                "Epoch {}/{} for '{}': loss {:.4}, accuracy {:.4}",
                epoch, total, series_id, progress.loss, progress.accuracy
            );
            self.progress.publish(series_id, progress);
        }

        let last_price = points.last().map_or(0.0, |p| p.price);
        let (predictions, metrics) = self.simulation.with(|rng| {
            (project(last_price, horizon, rng), simulated_metrics(last_price, rng))
        });

        Ok(Forecast {
            predictions,
            metrics,
            model_summary: model_summary(lookback),
        })
    }
}
