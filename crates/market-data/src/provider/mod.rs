//! Upstream source abstractions and implementations.
//!
//! This module contains:
//! - The `UpstreamSource` trait every adapter implements
//! - Per-source rate limit configuration
//! - The CoinGecko and alternative.me Fear & Greed adapters
//!
//! Adapters perform exactly one HTTP call per `fetch`. Retrying, caching and
//! fallback are the gateway's job.

mod capabilities;
mod traits;

pub mod coingecko;
pub mod fear_greed;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::errors::MarketDataError;

pub use capabilities::RateLimit;
pub use traits::UpstreamSource;

/// Default bound on a single upstream call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest response body kept in a [`MarketDataError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Build the HTTP client shared by an adapter.
pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("coinlens/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Append caller-supplied `params` to an adapter's own query.
///
/// Parameters the adapter already sets identify the resource and win over extras
/// of the same name.
pub(crate) fn with_params(
    provider: &str,
    base: Vec<(&'static str, String)>,
    params: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = base
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    for (name, value) in params {
        if query.iter().any(|(existing, _)| existing == name) {
            warn!("{} ignoring extra parameter '{}': set by the resource", provider, name);
            continue;
        }
        query.push((name.clone(), value.clone()));
    }
    query
}

/// GET `url` and return the body of a 2xx response.
///
/// Non-2xx statuses are returned unmodified as [`MarketDataError::Status`].
pub(crate) async fn get_text(
    client: &Client,
    provider: &str,
    url: &str,
    query: &[(String, String)],
) -> Result<String, MarketDataError> {
    debug!("{} request: {} with {} params", provider, url, query.len());

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .query(query)
        .send()
        .await
        .map_err(|e| MarketDataError::from_reqwest(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(MarketDataError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response
        .text()
        .await
        .map_err(|e| MarketDataError::from_reqwest(provider, e))
}

/// Decode a JSON body, mapping failures to [`MarketDataError::InvalidPayload`].
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    provider: &str,
    body: &str,
) -> Result<T, MarketDataError> {
    serde_json::from_str(body).map_err(|e| MarketDataError::InvalidPayload {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_params_never_override_resource_query() {
        let params = BTreeMap::from([
            ("category".to_string(), "layer-1".to_string()),
            ("days".to_string(), "5".to_string()),
        ]);

        let query = with_params("TEST", vec![("days", "60".to_string())], &params);

        assert_eq!(
            query,
            vec![
                ("days".to_string(), "60".to_string()),
                ("category".to_string(), "layer-1".to_string()),
            ]
        );
    }
}
