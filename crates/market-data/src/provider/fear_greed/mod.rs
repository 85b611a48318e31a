//! alternative.me Crypto Fear & Greed Index source.
//!
//! The API returns every field as a string; values are parsed and checked here.
//! API documentation: https://alternative.me/crypto/fear-and-greed-index/#api

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{FearGreedEntry, Resource, ResourceData};
use crate::provider::{build_client, decode, get_text, with_params, RateLimit, UpstreamSource};

pub const DEFAULT_BASE_URL: &str = "https://api.alternative.me";
const PROVIDER_ID: &str = "FEAR_GREED";

#[derive(Debug, Deserialize)]
struct FngResponse {
    data: Vec<FngItem>,
}

#[derive(Debug, Deserialize)]
struct FngItem {
    value: String,
    value_classification: String,
    timestamp: String,
}

/// Fear & Greed index source.
pub struct FearGreedSource {
    client: Client,
    base_url: String,
}

impl FearGreedSource {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Normalise a `/fng/` body into index entries, most recent first.
    pub fn parse(body: &str) -> Result<ResourceData, MarketDataError> {
        let response: FngResponse = decode(PROVIDER_ID, body)?;
        let invalid = |field: &str, raw: &str| MarketDataError::InvalidPayload {
            provider: PROVIDER_ID.to_string(),
            message: format!("invalid {} '{}'", field, raw),
        };

        let entries = response
            .data
            .into_iter()
            .map(|item| {
                let value = item
                    .value
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| invalid("value", &item.value))?;
                let timestamp = item
                    .timestamp
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| invalid("timestamp", &item.timestamp))?;
                Ok(FearGreedEntry {
                    value,
                    classification: item.value_classification,
                    timestamp,
                })
            })
            .collect::<Result<Vec<_>, MarketDataError>>()?;

        Ok(ResourceData::FearGreed(entries))
    }
}

#[async_trait]
impl UpstreamSource for FearGreedSource {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, resource: &Resource) -> bool {
        matches!(resource, Resource::FearGreed { .. })
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 30,
            burst_capacity: 5.0,
        }
    }

    async fn fetch(
        &self,
        resource: &Resource,
        params: &BTreeMap<String, String>,
    ) -> Result<ResourceData, MarketDataError> {
        let Resource::FearGreed { limit } = resource else {
            return Err(MarketDataError::Unsupported(resource.key()));
        };

        let url = format!("{}/fng/", self.base_url);
        let query = with_params(PROVIDER_ID, vec![("limit", limit.to_string())], params);
        let body = get_text(&self.client, PROVIDER_ID, &url, &query).await?;
        Self::parse(&body)
    }
}

#[cfg(test)]
pub(crate) mod samples {
    pub const FNG: &str = r#"{
        "name":"Fear and Greed Index",
        "data":[
            {"value":"72","value_classification":"Greed","timestamp":"1715904000","time_until_update":"3600"},
            {"value":"64","value_classification":"Greed","timestamp":"1715817600"}
        ],
        "metadata":{"error":null}
    }"#;
}
