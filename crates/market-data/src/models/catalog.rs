/// A coin the dashboard knows without asking upstream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CatalogCoin {
    pub id: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    /// Rough USD price used to seed synthetic series.
    pub base_price_usd: f64,
}

impl CatalogCoin {
    pub fn image_url(&self) -> String {
        format!(
            "https://assets.coingecko.com/coins/images/{}/large/{}.png",
            self.id, self.id
        )
    }
}

const fn coin(
    id: &'static str,
    name: &'static str,
    symbol: &'static str,
    price: f64,
) -> CatalogCoin {
    CatalogCoin {
        id,
        name,
        symbol,
        base_price_usd: price,
    }
}

/// Top 20 coins by market cap, in rank order.
pub static TOP_COINS: [CatalogCoin; 20] = [
    coin("bitcoin", "Bitcoin", "btc", 50_000.0),
    coin("ethereum", "Ethereum", "eth", 3_000.0),
    coin("binancecoin", "Binance Coin", "bnb", 500.0),
    coin("solana", "Solana", "sol", 100.0),
    coin("ripple", "XRP", "xrp", 0.5),
    coin("cardano", "Cardano", "ada", 0.45),
    coin("avalanche-2", "Avalanche", "avax", 35.0),
    coin("dogecoin", "Dogecoin", "doge", 0.12),
    coin("polkadot", "Polkadot", "dot", 7.0),
    coin("chainlink", "Chainlink", "link", 14.0),
    coin("tron", "TRON", "trx", 0.12),
    coin("polygon", "Polygon", "matic", 0.7),
    coin("litecoin", "Litecoin", "ltc", 80.0),
    coin("cosmos", "Cosmos", "atom", 9.0),
    coin("uniswap", "Uniswap", "uni", 7.0),
    coin("monero", "Monero", "xmr", 150.0),
    coin("stellar", "Stellar", "xlm", 0.11),
    coin("ethereum-classic", "Ethereum Classic", "etc", 25.0),
    coin("filecoin", "Filecoin", "fil", 5.0),
    coin("near", "NEAR Protocol", "near", 5.0),
];

pub fn lookup(id: &str) -> Option<&'static CatalogCoin> {
    TOP_COINS.iter().find(|c| c.id == id)
}

/// 1-based rank within [`TOP_COINS`].
pub fn rank_of(id: &str) -> Option<u32> {
    TOP_COINS
        .iter()
        .position(|c| c.id == id)
        .map(|i| i as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_rank() {
        assert_eq!(lookup("bitcoin").map(|c| c.symbol), Some("btc"));
        assert_eq!(rank_of("ethereum"), Some(2));
        assert_eq!(rank_of("near"), Some(20));
        assert!(lookup("not-a-coin").is_none());
    }
}
