use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::retry::{BackoffPolicy, RetryState};
use super::MarketDataError;

/// Fixed failure taxonomy used for retry and display decisions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No response received (connect/DNS failure or timeout).
    Network,
    /// Upstream (HTTP 429) or local throttling.
    RateLimit,
    /// The requested resource does not exist upstream.
    NotFound,
    /// Bad request (HTTP 400) or a payload that failed structural validation.
    InvalidData,
    /// Upstream 5xx.
    ServerError,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Kinds that may succeed if the same request is simply repeated later.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }

    /// Text suitable for an error banner.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::Network => {
                "Connection Error: Unable to connect to the server. Please check your internet connection and try again."
            }
            Self::RateLimit => {
                "Rate Limit: We've hit our API limit. Please wait a few minutes before trying again."
            }
            Self::NotFound => {
                "Not Found: The cryptocurrency you're looking for doesn't exist or has been removed."
            }
            Self::InvalidData => {
                "Data Error: We received invalid data from the server. Please try again later."
            }
            Self::ServerError => {
                "Server Error: Something went wrong on our end. Please try again later."
            }
            Self::Unknown => "Unexpected Error: Something went wrong. Please try again later.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "NETWORK",
            Self::RateLimit => "RATE_LIMIT",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidData => "INVALID_DATA",
            Self::ServerError => "SERVER_ERROR",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A failure normalised into the [`ErrorKind`] taxonomy.
///
/// The kind is fixed at classification time. Retrying produces a new value via
/// [`next_attempt`](Self::next_attempt) that keeps kind, status and cause.
#[derive(Clone, Debug)]
pub struct ClassifiedError {
    kind: ErrorKind,
    http_status: Option<u16>,
    attempt: u32,
    cause: Arc<MarketDataError>,
}

impl ClassifiedError {
    /// Classify a failure. Never fails; the first matching rule wins:
    ///
    /// 1. transport failure (no response, timeout) -> `Network`
    /// 2. HTTP 429 or local throttling -> `RateLimit`
    /// 3. HTTP 404 -> `NotFound`
    /// 4. HTTP 400 or structurally invalid payload -> `InvalidData`
    /// 5. HTTP >= 500 -> `ServerError`
    /// 6. everything else -> `Unknown`
    pub fn classify(failure: MarketDataError, attempt: u32) -> Self {
        Self::classify_shared(Arc::new(failure), attempt)
    }

    /// Same as [`classify`](Self::classify) for a cause that is already shared.
    pub fn classify_shared(cause: Arc<MarketDataError>, attempt: u32) -> Self {
        let (kind, http_status) = match cause.as_ref() {
            MarketDataError::Transport { .. } => (ErrorKind::Network, None),
            MarketDataError::Status { status: 429, .. } => (ErrorKind::RateLimit, Some(429)),
            MarketDataError::Throttled { .. } => (ErrorKind::RateLimit, None),
            MarketDataError::Status { status: 404, .. } => (ErrorKind::NotFound, Some(404)),
            MarketDataError::Status { status: 400, .. } => (ErrorKind::InvalidData, Some(400)),
            MarketDataError::InvalidPayload { .. } => (ErrorKind::InvalidData, None),
            MarketDataError::Status { status, .. } if *status >= 500 => {
                (ErrorKind::ServerError, Some(*status))
            }
            MarketDataError::Status { status, .. } => (ErrorKind::Unknown, Some(*status)),
            MarketDataError::InvalidRequest(_)
            | MarketDataError::Unsupported(_)
            | MarketDataError::Synthesis { .. } => (ErrorKind::Unknown, None),
        };

        Self {
            kind,
            http_status,
            attempt,
            cause,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// Zero-based retry counter supplied by the caller at classification time.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn cause(&self) -> &MarketDataError {
        &self.cause
    }

    /// The same failure, one retry later.
    pub fn next_attempt(&self) -> Self {
        Self {
            kind: self.kind,
            http_status: self.http_status,
            attempt: self.attempt.saturating_add(1),
            cause: Arc::clone(&self.cause),
        }
    }

    /// Whether the default policy allows another attempt.
    pub fn should_retry(&self) -> bool {
        BackoffPolicy::default().should_retry(self.kind, self.attempt)
    }

    /// Retry guidance computed fresh from this error and `policy`.
    pub fn retry_state(&self, policy: &BackoffPolicy) -> RetryState {
        RetryState::from_error(self, policy)
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (attempt {}): {}", self.kind, self.attempt, self.cause)
    }
}

impl std::error::Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

impl Serialize for ClassifiedError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ClassifiedError", 6)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("httpStatus", &self.http_status)?;
        state.serialize_field("attempt", &self.attempt)?;
        state.serialize_field("message", &self.cause.to_string())?;
        state.serialize_field("userMessage", self.kind.user_message())?;
        state.serialize_field("retryState", &self.retry_state(&BackoffPolicy::default()))?;
        state.end()
    }
}
