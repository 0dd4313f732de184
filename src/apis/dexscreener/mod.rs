/// DexScreener API adapter
///
/// API Documentation: https://docs.dexscreener.com/api/reference
///
/// Endpoints implemented:
/// 1. /token-pairs/v1/{chainId}/{tokenAddress} - All pools for a token
/// 2. /token-profiles/latest/v1 - Latest token profiles (discovery feed)
pub mod types;

use self::types::{DexScreenerPairRaw, TokenProfileRaw};
use crate::apis::provider::{AuthScheme, ProviderClient, ProviderSettings};
use crate::apis::types::{TokenPool, TokenProfile};
use crate::config::DexScreenerConfig;
use crate::errors::ProviderError;
use crate::logger::{self, LogTag};
use std::time::Duration;

pub const PROVIDER_KEY: &str = "dexscreener";

pub fn provider_settings(config: &DexScreenerConfig) -> ProviderSettings {
    ProviderSettings {
        key: PROVIDER_KEY.to_string(),
        base_url: config.base_url.clone(),
        api_key: String::new(),
        auth: AuthScheme::None,
        min_interval: Duration::from_millis(config.min_interval_ms),
        timeout: Duration::from_secs(config.timeout_secs),
        max_queue_depth: config.max_queue_depth,
        enabled: config.enabled,
    }
}

pub struct DexScreenerClient {
    client: ProviderClient,
}

impl DexScreenerClient {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.client
    }

    /// All pools for a token across every DEX on `chain_id`
    pub async fn fetch_token_pools(&self, chain_id: &str, token_address: &str) -> Result<Vec<TokenPool>, ProviderError> {
        let endpoint = format!("token-pairs/v1/{}/{}", chain_id, token_address);

        logger::debug(
            LogTag::Api,
            &format!(
                "[DEXSCREENER] Fetching token pools: token={}, chain={}",
                token_address, chain_id
            ),
        );

        let pairs: Vec<DexScreenerPairRaw> = self.client.fetch(&endpoint, &[]).await?;
        Ok(pairs.iter().map(DexScreenerPairRaw::to_pool).collect())
    }

    pub async fn fetch_latest_profiles(&self) -> Result<Vec<TokenProfile>, ProviderError> {
        let profiles: Vec<TokenProfileRaw> = self.client.fetch("token-profiles/latest/v1", &[]).await?;
        Ok(profiles.iter().map(TokenProfileRaw::to_profile).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::client::testing::MockTransport;
    use crate::apis::provider::testing::client;
    use std::sync::Arc;

    fn dex(transport: Arc<MockTransport>) -> DexScreenerClient {
        let settings = provider_settings(&DexScreenerConfig {
            base_url: "https://dex.test".to_string(),
            min_interval_ms: 0,
            ..Default::default()
        });
        DexScreenerClient::new(client(settings, transport))
    }

    #[tokio::test]
    async fn test_token_pools_mapping() {
        let body = r#"[{"chainId":"solana","dexId":"raydium","pairAddress":"PAIR1",
            "baseToken":{"address":"MINT","symbol":"BONK"},
            "quoteToken":{"address":"SOL","symbol":"SOL"},
            "priceUsd":"0.0000231","volume":{"h24":125000.5},
            "priceChange":{"h24":-3.2},"liquidity":{"usd":800000.0},
            "pairCreatedAt":1700000000000}]"#;
        let transport = Arc::new(MockTransport::new().route("token-pairs/v1/solana/MINT", 200, body));

        let pools = dex(transport).fetch_token_pools("solana", "MINT").await.unwrap();
        assert_eq!(pools.len(), 1);
        let pool = &pools[0];
        assert_eq!(pool.dex_id, "raydium");
        assert_eq!(pool.base_token_symbol, "bonk");
        assert_eq!(pool.price_usd, Some(0.0000231));
        assert_eq!(pool.liquidity_usd, Some(800000.0));
        assert_eq!(pool.volume_h24, Some(125000.5));
    }

    #[tokio::test]
    async fn test_latest_profiles() {
        let body = r#"[{"chainId":"solana","tokenAddress":"MINT","url":"https://dex/x","icon":null}]"#;
        let transport = Arc::new(MockTransport::new().route("token-profiles/latest", 200, body));

        let profiles = dex(transport).fetch_latest_profiles().await.unwrap();
        assert_eq!(profiles[0].token_address, "MINT");
        assert!(profiles[0].description.is_none());
    }

    #[tokio::test]
    async fn test_not_found_surfaces_status() {
        let transport = Arc::new(MockTransport::new());
        let err = dex(transport).fetch_token_pools("solana", "NOPE").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
