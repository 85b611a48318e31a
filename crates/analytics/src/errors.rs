//! Error types for the analytics crate.

use coinlens_market_data::ClassifiedError;
use thiserror::Error;

/// Type alias for Result using [`AnalyticsError`].
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// The gateway could not produce any data, not even a substitute.
    #[error("Market data unavailable: {0}")]
    Data(#[from] ClassifiedError),

    #[error("Expected {expected} payload, got {actual}")]
    UnexpectedPayload {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Need at least {required} data points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
