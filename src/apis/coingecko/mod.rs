/// CoinGecko API adapter
///
/// API Documentation: https://docs.coingecko.com/reference/introduction
///
/// Endpoints implemented:
/// 1. /coins/markets - Top coins by market cap, paged
/// 2. /search/trending - Trending coins
/// 3. /search - Coin search by name or symbol
pub mod types;

use self::types::{CoinGeckoMarket, SearchResponse, TrendingResponse};
use crate::apis::provider::{AuthScheme, ProviderClient, ProviderSettings};
use crate::apis::types::{CoinListing, SearchResult, TrendingCoin};
use crate::config::CoinGeckoConfig;
use crate::errors::ProviderError;
use crate::logger::{self, LogTag};
use std::time::Duration;

pub const PROVIDER_KEY: &str = "coingecko";
pub const API_KEY_PARAM: &str = "x_cg_demo_api_key";

/// CoinGecko caps `per_page` at 250
pub const MAX_PER_PAGE: u32 = 250;

pub fn provider_settings(config: &CoinGeckoConfig) -> ProviderSettings {
    ProviderSettings {
        key: PROVIDER_KEY.to_string(),
        base_url: config.base_url.clone(),
        api_key: config.api_key.clone(),
        auth: AuthScheme::Query(API_KEY_PARAM),
        min_interval: Duration::from_millis(config.min_interval_ms),
        timeout: Duration::from_secs(config.timeout_secs),
        max_queue_depth: config.max_queue_depth,
        enabled: config.enabled,
    }
}

pub struct CoinGeckoClient {
    client: ProviderClient,
}

impl CoinGeckoClient {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.client
    }

    /// One page of coins ordered by market cap
    pub async fn fetch_markets(&self, page: u32, per_page: u32) -> Result<Vec<CoinListing>, ProviderError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);

        logger::debug(
            LogTag::Api,
            &format!("[COINGECKO] Fetching markets: page={}, per_page={}", page, per_page),
        );

        let markets: Vec<CoinGeckoMarket> = self
            .client
            .fetch(
                "coins/markets",
                &[
                    ("vs_currency", "usd".to_string()),
                    ("order", "market_cap_desc".to_string()),
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
                    ("price_change_percentage", "1h,24h,7d".to_string()),
                ],
            )
            .await?;

        Ok(markets.iter().map(CoinGeckoMarket::to_listing).collect())
    }

    pub async fn fetch_trending(&self) -> Result<Vec<TrendingCoin>, ProviderError> {
        let response: TrendingResponse = self.client.fetch("search/trending", &[]).await?;
        Ok(response.coins.iter().map(|c| c.item.to_trending()).collect())
    }

    /// `query` is expected to be trimmed and non-empty
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let response: SearchResponse = self
            .client
            .fetch("search", &[("query", query.to_string())])
            .await?;
        Ok(response.coins.iter().map(|c| c.to_result()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::client::testing::MockTransport;
    use crate::apis::provider::testing::client;
    use std::sync::Arc;

    fn gecko(transport: Arc<MockTransport>) -> CoinGeckoClient {
        let settings = provider_settings(&CoinGeckoConfig {
            base_url: "https://gecko.test/api/v3".to_string(),
            api_key: "demo".to_string(),
            min_interval_ms: 0,
            ..Default::default()
        });
        CoinGeckoClient::new(client(settings, transport))
    }

    #[tokio::test]
    async fn test_markets_page_params_and_mapping() {
        let body = r#"[{"id":"bitcoin","symbol":"BTC","name":"Bitcoin","current_price":65000.0,
                        "market_cap":1.2e12,"market_cap_rank":1,"total_volume":3.0e10,
                        "price_change_percentage_24h":1.5}]"#;
        let transport = Arc::new(MockTransport::new().route("coins/markets", 200, body));
        let gecko = gecko(transport.clone());

        let coins = gecko.fetch_markets(0, 1000).await.unwrap();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].symbol, "btc");
        assert_eq!(coins[0].rank, Some(1));
        assert_eq!(coins[0].percent_change_24h, Some(1.5));

        let url = &transport.calls()[0].1.url;
        assert!(url.contains("per_page=250"));
        assert!(url.contains("page=1"));
        assert!(url.contains("x_cg_demo_api_key=demo"));
    }

    #[tokio::test]
    async fn test_trending_unwraps_items() {
        let body = r#"{"coins":[{"item":{"id":"pepe","name":"Pepe","symbol":"PEPE",
                        "market_cap_rank":40,"thumb":"t.png","price_btc":1e-10,"score":0}}]}"#;
        let transport = Arc::new(MockTransport::new().route("search/trending", 200, body));

        let trending = gecko(transport).fetch_trending().await.unwrap();
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].id, "pepe");
        assert_eq!(trending[0].symbol, "pepe");
    }

    #[tokio::test]
    async fn test_search_passes_query() {
        let body = r#"{"coins":[{"id":"solana","name":"Solana","symbol":"SOL","market_cap_rank":5}]}"#;
        let transport = Arc::new(MockTransport::new().route("/search?", 200, body));
        let gecko = gecko(transport.clone());

        let results = gecko.search("sol").await.unwrap();
        assert_eq!(results[0].symbol, "sol");
        assert!(transport.calls()[0].1.url.contains("query=sol"));
    }
}
