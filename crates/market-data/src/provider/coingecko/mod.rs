//! CoinGecko market data source.
//!
//! Serves markets, coin detail, trending and historical charts from the public
//! v3 API. The free tier allows roughly 30 calls per minute and answers 429
//! beyond that.
//! API documentation: https://docs.coingecko.com/reference/introduction

mod models;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{
    with_moving_average, CoinDetail, CoinLinks, MarketCoin, PricePoint, Resource, ResourceData,
    TrendingCoin, MOVING_AVERAGE_WINDOW,
};
use crate::provider::{build_client, decode, get_text, with_params, RateLimit, UpstreamSource};

use models::{CoinResponse, MarketChartResponse, MarketItem, TrendingResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PROVIDER_ID: &str = "COINGECKO";

/// CoinGecko upstream source.
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
}

impl CoinGeckoSource {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Point the source at another host, e.g. a mock server or a proxy.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request_for(&self, resource: &Resource) -> Option<(String, Vec<(&'static str, String)>)> {
        let request = match resource {
            Resource::Markets {
                vs_currency,
                per_page,
                page,
            } => (
                format!("{}/coins/markets", self.base_url),
                vec![
                    ("vs_currency", vs_currency.clone()),
                    ("order", "market_cap_desc".to_string()),
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
                    ("sparkline", "false".to_string()),
                    ("price_change_percentage", "1h,24h,7d".to_string()),
                ],
            ),
            Resource::CoinDetail { id } => (
                format!("{}/coins/{}", self.base_url, urlencoding::encode(id)),
                vec![
                    ("localization", "false".to_string()),
                    ("tickers", "false".to_string()),
                    ("market_data", "true".to_string()),
                    ("community_data", "false".to_string()),
                    ("developer_data", "false".to_string()),
                    ("sparkline", "false".to_string()),
                ],
            ),
            Resource::Trending => (format!("{}/search/trending", self.base_url), Vec::new()),
            Resource::Historical { id, days } => (
                format!(
                    "{}/coins/{}/market_chart",
                    self.base_url,
                    urlencoding::encode(id)
                ),
                vec![
                    ("vs_currency", "usd".to_string()),
                    ("days", days.to_string()),
                    ("interval", "daily".to_string()),
                ],
            ),
            Resource::FearGreed { .. } => return None,
        };
        Some(request)
    }

    /// Normalise a raw response body for `resource`.
    pub fn parse(resource: &Resource, body: &str) -> Result<ResourceData, MarketDataError> {
        match resource {
            Resource::Markets { .. } => {
                let items: Vec<MarketItem> = decode(PROVIDER_ID, body)?;
                Ok(ResourceData::Markets(
                    items.into_iter().map(market_coin).collect(),
                ))
            }
            Resource::CoinDetail { .. } => {
                let coin: CoinResponse = decode(PROVIDER_ID, body)?;
                Ok(ResourceData::CoinDetail(Box::new(coin_detail(coin))))
            }
            Resource::Trending => {
                let trending: TrendingResponse = decode(PROVIDER_ID, body)?;
                Ok(ResourceData::Trending(
                    trending
                        .coins
                        .into_iter()
                        .map(|wrapper| {
                            let item = wrapper.item;
                            TrendingCoin {
                                id: item.id,
                                name: item.name,
                                symbol: item.symbol,
                                image: item.large.unwrap_or_default(),
                                market_cap_rank: item.market_cap_rank,
                                score: item.score,
                            }
                        })
                        .collect(),
                ))
            }
            Resource::Historical { .. } => {
                let chart: MarketChartResponse = decode(PROVIDER_ID, body)?;
                let points = chart
                    .prices
                    .into_iter()
                    .map(|(timestamp, price)| PricePoint::new(timestamp as i64, price))
                    .collect();
                Ok(ResourceData::Historical(with_moving_average(
                    points,
                    MOVING_AVERAGE_WINDOW,
                )))
            }
            Resource::FearGreed { .. } => Err(MarketDataError::Unsupported(resource.key())),
        }
    }
}

fn market_coin(item: MarketItem) -> MarketCoin {
    MarketCoin {
        id: item.id,
        name: item.name,
        symbol: item.symbol,
        image: item.image.unwrap_or_default(),
        current_price: item.current_price.unwrap_or_default(),
        market_cap: item.market_cap.unwrap_or_default(),
        market_cap_rank: item.market_cap_rank,
        total_volume: item.total_volume.unwrap_or_default(),
        price_change_percentage_1h: item.price_change_percentage_1h_in_currency,
        price_change_percentage_24h: item
            .price_change_percentage_24h_in_currency
            .or(item.price_change_percentage_24h),
        price_change_percentage_7d: item.price_change_percentage_7d_in_currency,
    }
}

fn coin_detail(coin: CoinResponse) -> CoinDetail {
    let data = coin.market_data;
    let usd = |map: &models::CurrencyMap| map.get("usd").copied().flatten();
    let gbp = |map: &models::CurrencyMap| map.get("gbp").copied().flatten();

    let links = CoinLinks {
        website_url: first_non_empty(&coin.links.homepage),
        twitter_url: coin
            .links
            .twitter_screen_name
            .filter(|name| !name.is_empty())
            .map(|name| format!("https://twitter.com/{}", name)),
        reddit_url: coin.links.subreddit_url.filter(|url| !url.is_empty()),
        github_url: first_non_empty(&coin.links.repos_url.github),
    };

    CoinDetail {
        id: coin.id,
        name: coin.name,
        symbol: coin.symbol,
        image: coin.image.large.unwrap_or_default(),
        description: coin.description.en.unwrap_or_default(),
        current_price: usd(&data.current_price).unwrap_or_default(),
        gbp_price: gbp(&data.current_price),
        price_change_percentage_24h: data.price_change_percentage_24h,
        price_change_percentage_7d: data.price_change_percentage_7d,
        price_change_percentage_30d: data.price_change_percentage_30d,
        market_cap: usd(&data.market_cap).unwrap_or_default(),
        gbp_market_cap: gbp(&data.market_cap),
        all_time_high: usd(&data.ath),
        gbp_all_time_high: gbp(&data.ath),
        all_time_high_date: data.ath_date.get("usd").copied().flatten(),
        circulating_supply: data.circulating_supply,
        max_supply: data.max_supply,
        volume_usd_24h: usd(&data.total_volume),
        volume_gbp_24h: gbp(&data.total_volume),
        market_cap_rank: coin.market_cap_rank,
        links,
    }
}

fn first_non_empty(values: &[String]) -> Option<String> {
    values.iter().find(|v| !v.trim().is_empty()).cloned()
}

#[async_trait]
impl UpstreamSource for CoinGeckoSource {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, resource: &Resource) -> bool {
        !matches!(resource, Resource::FearGreed { .. })
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 25,
            burst_capacity: 5.0,
        }
    }

    async fn fetch(
        &self,
        resource: &Resource,
        params: &BTreeMap<String, String>,
    ) -> Result<ResourceData, MarketDataError> {
        let (url, query) = self
            .request_for(resource)
            .ok_or_else(|| MarketDataError::Unsupported(resource.key()))?;
        let query = with_params(PROVIDER_ID, query, params);

        let body = get_text(&self.client, PROVIDER_ID, &url, &query).await?;
        let data = Self::parse(resource, &body)?;
        debug!("{} returned {} for '{}'", PROVIDER_ID, data.kind_name(), resource);
        Ok(data)
    }
}

#[cfg(test)]
pub(crate) mod samples {
    //! Trimmed recordings of real CoinGecko responses.

    pub const MARKETS: &str = r#"[
        {"id":"bitcoin","symbol":"btc","name":"Bitcoin","image":"https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
         "current_price":67123.0,"market_cap":1320000000000,"market_cap_rank":1,"total_volume":28000000000,
         "price_change_percentage_24h":1.2,"price_change_percentage_1h_in_currency":0.3,
         "price_change_percentage_24h_in_currency":1.2,"price_change_percentage_7d_in_currency":-2.5},
        {"id":"ethereum","symbol":"eth","name":"Ethereum","image":"https://assets.coingecko.com/coins/images/279/large/ethereum.png",
         "current_price":3500.5,"market_cap":420000000000,"market_cap_rank":2,"total_volume":15000000000,
         "price_change_percentage_24h":null,"price_change_percentage_1h_in_currency":null,
         "price_change_percentage_24h_in_currency":null,"price_change_percentage_7d_in_currency":null}
    ]"#;

    pub const COIN: &str = r#"{
        "id":"bitcoin","symbol":"btc","name":"Bitcoin",
        "image":{"thumb":"t","small":"s","large":"https://assets.coingecko.com/coins/images/1/large/bitcoin.png"},
        "description":{"en":"Bitcoin is the first decentralized cryptocurrency."},
        "links":{"homepage":["http://www.bitcoin.org","",""],"twitter_screen_name":"bitcoin",
                 "subreddit_url":"https://www.reddit.com/r/Bitcoin/","repos_url":{"github":["https://github.com/bitcoin/bitcoin"],"bitbucket":[]}},
        "market_cap_rank":1,
        "market_data":{
            "current_price":{"usd":67123.0,"gbp":52800.0,"eur":61900.0},
            "market_cap":{"usd":1320000000000,"gbp":1040000000000},
            "total_volume":{"usd":28000000000,"gbp":22000000000},
            "ath":{"usd":73738.0,"gbp":57800.0},
            "ath_date":{"usd":"2024-03-14T07:10:36.635Z","gbp":"2024-03-14T07:10:36.635Z"},
            "price_change_percentage_24h":1.2,"price_change_percentage_7d":-2.5,"price_change_percentage_30d":8.1,
            "circulating_supply":19700000.0,"max_supply":21000000.0
        }
    }"#;

    pub const TRENDING: &str = r#"{"coins":[
        {"item":{"id":"pepe","coin_id":29850,"name":"Pepe","symbol":"PEPE","market_cap_rank":24,
                 "thumb":"t","large":"https://assets.coingecko.com/coins/images/29850/large/pepe.jpeg","score":0}},
        {"item":{"id":"solana","coin_id":4128,"name":"Solana","symbol":"SOL","market_cap_rank":5,
                 "thumb":"t","large":"https://assets.coingecko.com/coins/images/4128/large/solana.png","score":1}}
    ],"nfts":[],"categories":[]}"#;

    pub const MARKET_CHART: &str = r#"{"prices":[
        [1700179200000,36500.5],[1700006400000,35500.0],[1700092800000,36000.25]
    ],"market_caps":[],"total_volumes":[]}"#;
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::errors::{ClassifiedError, ErrorKind};

    fn source(server: &mockito::Server) -> CoinGeckoSource {
        CoinGeckoSource::with_base_url(&server.url(), Duration::from_secs(5))
    }

    #[test]
    fn test_parse_markets() {
        let data = CoinGeckoSource::parse(&Resource::markets("usd", 2), samples::MARKETS).unwrap();
        let coins = data.as_markets().unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].id, "bitcoin");
        assert_eq!(coins[0].price_change_percentage_1h, Some(0.3));
        assert_eq!(coins[0].market_cap_rank, Some(1));
        assert_eq!(coins[1].price_change_percentage_24h, None);
    }

    #[test]
    fn test_parse_coin_detail_flattens_links() {
        let data = CoinGeckoSource::parse(&Resource::coin("bitcoin"), samples::COIN).unwrap();
        let detail = data.as_coin_detail().unwrap();
        assert_eq!(detail.current_price, 67123.0);
        assert_eq!(detail.gbp_price, Some(52800.0));
        assert_eq!(detail.links.website_url.as_deref(), Some("http://www.bitcoin.org"));
        assert_eq!(detail.links.twitter_url.as_deref(), Some("https://twitter.com/bitcoin"));
        assert_eq!(
            detail.links.github_url.as_deref(),
            Some("https://github.com/bitcoin/bitcoin")
        );
        assert!(detail.all_time_high_date.is_some());
    }

    #[test]
    fn test_parse_market_chart_sorts_and_averages() {
        let resource = Resource::historical("bitcoin", 3);
        let data = CoinGeckoSource::parse(&resource, samples::MARKET_CHART).unwrap();
        let points = data.as_historical().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].timestamp, 1_700_006_400_000);
        assert_eq!(points[0].date, "2023-11-15");
        assert!(points.iter().all(|p| p.moving_avg.is_none()));
    }

    #[test]
    fn test_parse_rejects_structurally_invalid_body() {
        let resource = Resource::historical("bitcoin", 3);
        let err = CoinGeckoSource::parse(&resource, r#"{"total_volumes":[]}"#).unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn test_fetch_trending() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search/trending")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(samples::TRENDING)
            .create_async()
            .await;

        let data = source(&server)
            .fetch(&Resource::Trending, &BTreeMap::new())
            .await
            .unwrap();
        let coins = data.as_trending().unwrap();
        assert_eq!(coins[0].id, "pepe");
        assert_eq!(coins[1].market_cap_rank, Some(5));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_sends_market_chart_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
                mockito::Matcher::UrlEncoded("days".into(), "60".into()),
                mockito::Matcher::UrlEncoded("interval".into(), "daily".into()),
            ]))
            .with_status(200)
            .with_body(samples::MARKET_CHART)
            .create_async()
            .await;

        let data = source(&server)
            .fetch(&Resource::historical("bitcoin", 60), &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(data.as_historical().unwrap().len(), 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_codes_pass_through() {
        let mut server = mockito::Server::new_async().await;
        for status in [429, 404, 500] {
            let mock = server
                .mock("GET", "/coins/bitcoin")
                .match_query(mockito::Matcher::Any)
                .with_status(status)
                .with_body("upstream says no")
                .create_async()
                .await;

            let err = source(&server)
                .fetch(&Resource::coin("bitcoin"), &BTreeMap::new())
                .await
                .unwrap_err();
            match err {
                MarketDataError::Status {
                    status: got, body, ..
                } => {
                    assert_eq!(got, status as u16);
                    assert_eq!(body, "upstream says no");
                }
                other => panic!("unexpected error: {:?}", other),
            }
            mock.remove_async().await;
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport() {
        let source = CoinGeckoSource::with_base_url("http://127.0.0.1:1", Duration::from_secs(1));
        let err = source
            .fetch(&Resource::Trending, &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out_as_network() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search/trending")
            .with_status(200)
            .with_chunked_body(|writer| {
                std::thread::sleep(Duration::from_secs(2));
                writer.write_all(samples::TRENDING.as_bytes())
            })
            .create_async()
            .await;

        let source = CoinGeckoSource::with_base_url(&server.url(), Duration::from_millis(200));
        let err = source
            .fetch(&Resource::Trending, &BTreeMap::new())
            .await
            .unwrap_err();

        assert!(
            matches!(err, MarketDataError::Transport { timeout: true, .. }),
            "unexpected error: {:?}",
            err
        );
        assert_eq!(ClassifiedError::classify(err, 0).kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_fetch_forwards_extra_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/markets")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("vs_currency".into(), "gbp".into()),
                mockito::Matcher::UrlEncoded("per_page".into(), "2".into()),
                mockito::Matcher::UrlEncoded("category".into(), "layer-1".into()),
            ]))
            .with_status(200)
            .with_body(samples::MARKETS)
            .create_async()
            .await;

        let params = BTreeMap::from([("category".to_string(), "layer-1".to_string())]);
        let data = source(&server)
            .fetch(&Resource::markets("gbp", 2), &params)
            .await
            .unwrap();
        assert_eq!(data.as_markets().unwrap().len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fear_greed_is_unsupported() {
        let source = CoinGeckoSource::new(Duration::from_secs(1));
        assert!(!source.supports(&Resource::fear_greed(1)));
        let err = source
            .fetch(&Resource::fear_greed(1), &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Unsupported(_)));
    }
}
