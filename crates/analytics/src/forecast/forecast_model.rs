use serde::{Deserialize, Serialize};

/// One observed price. Extra fields sent by clients (moving averages, dates) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SeriesPoint {
    #[serde(default)]
    pub timestamp: i64,
    pub price: f64,
}

/// Body of a train-and-predict call.
///
/// Also accepts the dashboard's field names (`coin`, `data`, `predictionDays`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRequest {
    #[serde(alias = "coin")]
    pub series_id: String,
    #[serde(alias = "data")]
    pub historical_points: Vec<SeriesPoint>,
    #[serde(default)]
    pub lookback_window: Option<u32>,
    #[serde(default, alias = "predictionDays")]
    pub horizon_days: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub predicted: f64,
    pub upper_bound: f64,
    pub lower_bound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub predictions: Vec<Prediction>,
    pub metrics: ForecastMetrics,
    pub model_summary: String,
}

/// Training progress for one series, published once per epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingProgress {
    pub epoch: u32,
    pub total_epochs: u32,
    pub loss: f64,
    pub accuracy: f64,
}

impl TrainingProgress {
    /// Progress before the first epoch.
    pub fn starting(total_epochs: u32) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            loss: 0.0,
            accuracy: 0.0,
        }
    }

    /// Terminal once every epoch has run.
    pub fn is_complete(&self) -> bool {
        self.epoch >= self.total_epochs
    }
}

impl Default for TrainingProgress {
    fn default() -> Self {
        Self::starting(super::DEFAULT_EPOCHS)
    }
}
