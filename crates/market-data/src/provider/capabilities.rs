//! Per-source rate limiting configuration.

/// Client-side budget for calls to one upstream source.
///
/// Sized below the provider's published limits so that local throttling
/// kicks in before the provider starts answering 429.
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimit {
    /// Sustained requests allowed per minute.
    pub requests_per_minute: u32,

    /// Requests allowed in a burst before the sustained rate applies.
    pub burst_capacity: f64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst_capacity: 10.0,
        }
    }
}
