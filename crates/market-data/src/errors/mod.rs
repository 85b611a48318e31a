//! Error types and classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: raw failures produced by upstream sources and the gateway
//! - [`ErrorKind`] and [`ClassifiedError`]: the fixed taxonomy every failure is normalised into
//! - [`BackoffPolicy`] and [`RetryState`]: retry eligibility and delays derived from a classification

mod classified;
mod retry;

pub use classified::{ClassifiedError, ErrorKind};
pub use retry::{BackoffPolicy, RetryState, MAX_RETRIES};

use thiserror::Error;

/// Errors that can occur while fetching or producing market data.
///
/// Variants describe *what happened*; the gateway turns them into a [`ClassifiedError`]
/// (see [`ClassifiedError::classify`]) which decides retry behaviour.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// No response was received: DNS/connect failure, reset connection or timeout.
    #[error("Transport error from {provider}: {message}")]
    Transport {
        /// The source that was being called
        provider: String,
        /// Description of the transport failure
        message: String,
        /// Whether the request hit the configured timeout
        timeout: bool,
    },

    /// The provider answered with a non-2xx status.
    /// The status is passed through unmodified for classification.
    #[error("{provider} responded with HTTP {status}")]
    Status {
        /// The source that answered
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated), kept for diagnostics
        body: String,
    },

    /// The provider answered 2xx but the body did not have the expected structure.
    #[error("Invalid payload from {provider}: {message}")]
    InvalidPayload {
        /// The source that produced the payload
        provider: String,
        /// Description of the structural problem
        message: String,
    },

    /// The local token bucket for this provider is empty, so no request was sent.
    #[error("Rate limited locally: {provider}")]
    Throttled {
        /// The throttled source
        provider: String,
    },

    /// The request itself could not be understood (e.g. a malformed resource key).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No registered source can serve the resource.
    #[error("No source supports resource {0}")]
    Unsupported(String),

    /// The fallback synthesizer could not produce a payload.
    /// This is a programming error, not an upstream condition.
    #[error("Synthesis failed for {resource}: {message}")]
    Synthesis {
        /// Resource key that was being synthesized
        resource: String,
        /// Description of the failure
        message: String,
    },
}

impl MarketDataError {
    /// Map a `reqwest` failure from `provider` onto the matching variant.
    ///
    /// Decoding failures are structural problems with an otherwise valid response;
    /// everything else means no usable response was received.
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::InvalidPayload {
                provider: provider.to_string(),
                message: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return Self::Status {
                provider: provider.to_string(),
                status: status.as_u16(),
                body: String::new(),
            };
        }
        Self::Transport {
            provider: provider.to_string(),
            message: err.to_string(),
            timeout: err.is_timeout(),
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = MarketDataError::Status {
            provider: "COINGECKO".to_string(),
            status: 429,
            body: String::new(),
        };
        assert_eq!(format!("{}", error), "COINGECKO responded with HTTP 429");

        let error = MarketDataError::Throttled {
            provider: "COINGECKO".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited locally: COINGECKO");

        let error = MarketDataError::InvalidPayload {
            provider: "FEAR_GREED".to_string(),
            message: "missing data".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Invalid payload from FEAR_GREED: missing data"
        );
    }

    #[test]
    fn test_http_status_only_for_status_errors() {
        let error = MarketDataError::Status {
            provider: "COINGECKO".to_string(),
            status: 404,
            body: "coin not found".to_string(),
        };
        assert_eq!(error.http_status(), Some(404));

        let error = MarketDataError::Transport {
            provider: "COINGECKO".to_string(),
            message: "connection refused".to_string(),
            timeout: false,
        };
        assert_eq!(error.http_status(), None);
    }
}
