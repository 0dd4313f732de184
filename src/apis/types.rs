/// Normalized shapes returned by the provider adapters
///
/// Every adapter maps its own wire format into these types so the gateway,
/// cache and callers never see provider-specific JSON.
use serde::{Deserialize, Serialize};

/// One coin in a market listing (CoinMarketCap listings or CoinGecko markets)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinListing {
    pub id: String,
    pub name: String,
    /// Always lower-case
    pub symbol: String,
    pub slug: String,
    pub rank: Option<u32>,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub date_added: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GainersLosers {
    pub gainers: Vec<CoinListing>,
    pub losers: Vec<CoinListing>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendingCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub thumb: Option<String>,
    pub price_btc: Option<f64>,
    pub score: u32,
}

/// A DEX liquidity pool (pair) for a token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPool {
    pub chain_id: String,
    pub dex_id: String,
    pub pair_address: String,
    pub url: Option<String>,
    pub base_token_address: String,
    pub base_token_symbol: String,
    pub quote_token_address: String,
    pub quote_token_symbol: String,
    pub price_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub volume_h24: Option<f64>,
    pub price_change_h24: Option<f64>,
    pub market_cap: Option<f64>,
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub thumb: Option<String>,
}

/// Recently published token profile (discovery feed)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenProfile {
    pub chain_id: String,
    pub token_address: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Pool summary computed by the analysis refresh task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenAnalysis {
    pub chain_id: String,
    pub token_address: String,
    pub pool_count: usize,
    pub total_liquidity_usd: f64,
    pub total_volume_h24: f64,
    pub best_pair_address: Option<String>,
    pub best_pair_liquidity_usd: Option<f64>,
    pub analyzed_at: String,
}

impl TokenAnalysis {
    pub fn from_pools(chain_id: &str, token_address: &str, pools: &[TokenPool]) -> Self {
        let best = pools.iter().max_by(|a, b| {
            a.liquidity_usd
                .unwrap_or(0.0)
                .total_cmp(&b.liquidity_usd.unwrap_or(0.0))
        });

        Self {
            chain_id: chain_id.to_string(),
            token_address: token_address.to_string(),
            pool_count: pools.len(),
            total_liquidity_usd: pools.iter().filter_map(|p| p.liquidity_usd).sum(),
            total_volume_h24: pools.iter().filter_map(|p| p.volume_h24).sum(),
            best_pair_address: best.map(|p| p.pair_address.clone()),
            best_pair_liquidity_usd: best.and_then(|p| p.liquidity_usd),
            analyzed_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Parse a numeric string field; providers send prices as strings
pub(crate) fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_picks_most_liquid_pair() {
        let pools = vec![
            TokenPool {
                pair_address: "small".to_string(),
                liquidity_usd: Some(1_000.0),
                volume_h24: Some(50.0),
                ..Default::default()
            },
            TokenPool {
                pair_address: "deep".to_string(),
                liquidity_usd: Some(90_000.0),
                volume_h24: None,
                ..Default::default()
            },
        ];

        let analysis = TokenAnalysis::from_pools("solana", "mint", &pools);
        assert_eq!(analysis.pool_count, 2);
        assert_eq!(analysis.best_pair_address.as_deref(), Some("deep"));
        assert!((analysis.total_liquidity_usd - 91_000.0).abs() < f64::EPSILON);
        assert!((analysis.total_volume_h24 - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_pool_list_analysis() {
        let analysis = TokenAnalysis::from_pools("ethereum", "0xabc", &[]);
        assert_eq!(analysis.pool_count, 0);
        assert!(analysis.best_pair_address.is_none());
    }

    #[test]
    fn test_parse_f64_handles_strings() {
        assert_eq!(parse_f64(Some(" 1.25 ")), Some(1.25));
        assert_eq!(parse_f64(Some("n/a")), None);
        assert_eq!(parse_f64(None), None);
    }
}
