use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use coinlens_market_data::{TtlPolicy, DEFAULT_MAX_ENTRIES};
use tracing::warn;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_FEAR_GREED_URL: &str = "https://api.alternative.me";

pub struct Config {
    pub listen_addr: SocketAddr,
    pub coingecko_url: String,
    pub fear_greed_url: String,
    pub upstream_timeout: Duration,
    pub request_timeout: Duration,
    pub cors_allow: Vec<String>,
    pub cache_max_entries: usize,
    pub ttl: TtlPolicy,
}

impl Config {
    /// Read `COINLENS_*` variables, loading `.env` first.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source. Bad values fall back to defaults,
    /// except the listen address.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let listen_addr =
            lookup("COINLENS_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .with_context(|| format!("Invalid COINLENS_LISTEN_ADDR '{}'", listen_addr))?;

        let url = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let number = |key: &str, default: u64| parse_or(&lookup, key, default);

        let cors_allow = lookup("COINLENS_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let defaults = TtlPolicy::default();
        let ttl = |family: &str, default: Duration| {
            Duration::from_secs(number(&format!("COINLENS_TTL_{}_SECS", family), default.as_secs()))
        };

        Ok(Self {
            listen_addr,
            coingecko_url: url("COINLENS_COINGECKO_URL", DEFAULT_COINGECKO_URL),
            fear_greed_url: url("COINLENS_FEAR_GREED_URL", DEFAULT_FEAR_GREED_URL),
            upstream_timeout: Duration::from_millis(number("COINLENS_UPSTREAM_TIMEOUT_MS", 10_000)),
            request_timeout: Duration::from_millis(number("COINLENS_REQUEST_TIMEOUT_MS", 30_000)),
            cors_allow,
            cache_max_entries: number("COINLENS_CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES as u64)
                as usize,
            ttl: TtlPolicy {
                markets: ttl("MARKETS", defaults.markets),
                coin: ttl("COIN", defaults.coin),
                trending: ttl("TRENDING", defaults.trending),
                historical: ttl("HISTORY", defaults.historical),
                fear_greed: ttl("FEAR_GREED", defaults.fear_greed),
            },
        })
    }
}

fn parse_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!("Ignoring invalid {}='{}', using {}", key, raw, default);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.coingecko_url, DEFAULT_COINGECKO_URL);
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.cors_allow, vec!["*".to_string()]);
        assert_eq!(config.ttl, TtlPolicy::default());
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let config = config(&[
            ("COINLENS_COINGECKO_URL", "http://localhost:9000/api/"),
            ("COINLENS_TTL_MARKETS_SECS", "15"),
            ("COINLENS_TTL_HISTORY_SECS", "soon"),
            ("COINLENS_UPSTREAM_TIMEOUT_MS", "0"),
            ("COINLENS_CORS_ALLOW_ORIGINS", "http://a.test, http://b.test,"),
        ])
        .unwrap();
        assert_eq!(config.coingecko_url, "http://localhost:9000/api");
        assert_eq!(config.ttl.markets, Duration::from_secs(15));
        assert_eq!(config.ttl.historical, TtlPolicy::default().historical);
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.cors_allow, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_bad_listen_addr_is_an_error() {
        assert!(config(&[("COINLENS_LISTEN_ADDR", "nowhere")]).is_err());
    }
}
