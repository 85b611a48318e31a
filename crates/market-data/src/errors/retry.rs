use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use super::classified::{ClassifiedError, ErrorKind};

/// Maximum number of automatic retries for a transient failure.
pub const MAX_RETRIES: u32 = 3;

/// Upper bound for capped backoff delays.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Upper bound (exclusive) of the random jitter added to every delay.
const MAX_JITTER: Duration = Duration::from_secs(1);

/// Exponential backoff policy keyed by [`ErrorKind`].
///
/// # Behavior Summary
///
/// | Kind | Retried? | Base delay | Capped at `max_delay`? |
/// |------|----------|------------|------------------------|
/// | `Network` | yes | 2s | yes |
/// | `ServerError` | yes | 5s | yes |
/// | `RateLimit` | yes | 60s | no |
/// | `NotFound`, `InvalidData`, `Unknown` | never | - | - |
///
/// Delays are `base * 2^attempt + jitter` with jitter uniform in `[0, 1s)`.
/// Rate-limit delays are exempt from the cap: the provider asks for at least a
/// minute and clamping to 30s would only earn another 429.
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    /// Retries allowed while `attempt < max_retries`.
    pub max_retries: u32,
    /// Cap for network and server-error delays.
    pub max_delay: Duration,
    /// Exclusive upper bound for the added jitter.
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            max_delay: MAX_RETRY_DELAY,
            max_jitter: MAX_JITTER,
        }
    }
}

impl BackoffPolicy {
    /// Base delay for a kind, `None` if the kind is never retried.
    pub fn base_delay(kind: ErrorKind) -> Option<Duration> {
        match kind {
            ErrorKind::RateLimit => Some(Duration::from_secs(60)),
            ErrorKind::ServerError => Some(Duration::from_secs(5)),
            ErrorKind::Network => Some(Duration::from_secs(2)),
            ErrorKind::NotFound | ErrorKind::InvalidData | ErrorKind::Unknown => None,
        }
    }

    /// Whether `max_delay` applies to this kind.
    pub fn is_capped(kind: ErrorKind) -> bool {
        !matches!(kind, ErrorKind::RateLimit)
    }

    pub fn should_retry(&self, kind: ErrorKind, attempt: u32) -> bool {
        kind.is_transient() && attempt < self.max_retries
    }

    /// Delay before retrying `kind` for the given attempt, using the thread-local RNG for jitter.
    pub fn delay_for(&self, kind: ErrorKind, attempt: u32) -> Duration {
        self.delay_for_with(kind, attempt, &mut rand::thread_rng())
    }

    /// Same as [`delay_for`](Self::delay_for) with an explicit jitter source.
    ///
    /// Kinds that are never retried get `Duration::ZERO`.
    pub fn delay_for_with<R: Rng + ?Sized>(
        &self,
        kind: ErrorKind,
        attempt: u32,
        rng: &mut R,
    ) -> Duration {
        let Some(base) = Self::base_delay(kind) else {
            return Duration::ZERO;
        };

        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let exponential = base.saturating_mul(factor);
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            self.max_jitter.mul_f64(rng.gen::<f64>())
        };
        let delay = exponential.saturating_add(jitter);

        if Self::is_capped(kind) {
            delay.min(self.max_delay)
        } else {
            delay
        }
    }
}

/// Retry guidance for a [`ClassifiedError`]. Derived, never stored.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryState {
    pub can_retry: bool,
    /// Delay before the next automatic retry, in milliseconds when serialized.
    #[serde(rename = "nextRetryIn", serialize_with = "serialize_millis")]
    pub next_retry_in: Duration,
    pub max_retries: u32,
    pub retry_count: u32,
}

impl RetryState {
    pub fn from_error(error: &ClassifiedError, policy: &BackoffPolicy) -> Self {
        let can_retry = policy.should_retry(error.kind(), error.attempt());
        Self {
            can_retry,
            next_retry_in: if can_retry {
                policy.delay_for(error.kind(), error.attempt())
            } else {
                Duration::ZERO
            },
            max_retries: policy.max_retries,
            retry_count: error.attempt(),
        }
    }
}

fn serialize_millis<S: serde::Serializer>(
    value: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}
