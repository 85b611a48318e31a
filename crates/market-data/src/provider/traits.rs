//! Upstream source trait definition.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{Resource, ResourceData};

use super::capabilities::RateLimit;

/// An upstream API the gateway can call.
///
/// Implementations translate a [`Resource`] into an HTTP call and normalise the
/// response. They must pass non-2xx statuses through unmodified as
/// [`MarketDataError::Status`] so the gateway can classify them.
///
/// # Example
///
/// ```ignore
/// use std::collections::BTreeMap;
///
/// use async_trait::async_trait;
/// use coinlens_market_data::provider::{RateLimit, UpstreamSource};
///
/// struct StaticSource;
///
/// #[async_trait]
/// impl UpstreamSource for StaticSource {
///     fn id(&self) -> &'static str {
///         "STATIC"
///     }
///
///     fn supports(&self, resource: &Resource) -> bool {
///         matches!(resource, Resource::Trending)
///     }
///
///     async fn fetch(
///         &self,
///         _resource: &Resource,
///         _params: &BTreeMap<String, String>,
///     ) -> Result<ResourceData, MarketDataError> {
///         Ok(ResourceData::Trending(Vec::new()))
///     }
/// }
/// ```
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Constant identifier such as "COINGECKO", used for logs and rate limiting.
    fn id(&self) -> &'static str;

    /// Whether this source can serve `resource`.
    fn supports(&self, resource: &Resource) -> bool;

    /// Local rate limit applied before each call.
    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    /// Perform exactly one upstream call for `resource`.
    ///
    /// `params` are sent as extra query parameters alongside the ones the
    /// resource implies.
    async fn fetch(
        &self,
        resource: &Resource,
        params: &BTreeMap<String, String>,
    ) -> Result<ResourceData, MarketDataError>;
}
