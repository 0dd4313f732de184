/// CoinMarketCap listings adapter
///
/// Endpoints implemented:
/// 1. /v1/cryptocurrency/listings/latest - Latest listings ranked by market cap
/// 2. /v1/cryptocurrency/trending/gainers-losers - Biggest 24h movers
pub mod types;

use self::types::{CmcCoin, CmcResponse};
use crate::apis::provider::{AuthScheme, ProviderClient, ProviderSettings};
use crate::apis::types::{CoinListing, GainersLosers};
use crate::config::CoinMarketCapConfig;
use crate::errors::ProviderError;
use crate::logger::{self, LogTag};
use std::cmp::Ordering;
use std::time::Duration;

pub const PROVIDER_KEY: &str = "coinmarketcap";
pub const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

const LISTINGS_ENDPOINT: &str = "v1/cryptocurrency/listings/latest";
const GAINERS_LOSERS_ENDPOINT: &str = "v1/cryptocurrency/trending/gainers-losers";

pub const MAX_LISTINGS_LIMIT: u32 = 5000;
pub const MAX_GAINERS_LOSERS_LIMIT: u32 = 200;

pub fn provider_settings(config: &CoinMarketCapConfig) -> ProviderSettings {
    ProviderSettings {
        key: PROVIDER_KEY.to_string(),
        base_url: config.base_url.clone(),
        api_key: config.api_key.clone(),
        auth: AuthScheme::Header(API_KEY_HEADER),
        min_interval: Duration::from_millis(config.min_interval_ms),
        timeout: Duration::from_secs(config.timeout_secs),
        max_queue_depth: config.max_queue_depth,
        enabled: config.enabled,
    }
}

pub struct CoinMarketCapClient {
    client: ProviderClient,
}

impl CoinMarketCapClient {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.client
    }

    /// Latest listings, `limit` clamped to 1..=5000 and `start` to >= 1
    pub async fn fetch_listings(&self, limit: u32, start: u32) -> Result<Vec<CoinListing>, ProviderError> {
        let limit = limit.clamp(1, MAX_LISTINGS_LIMIT);
        let start = start.max(1);

        logger::debug(
            LogTag::Api,
            &format!("[COINMARKETCAP] Fetching listings: limit={}, start={}", limit, start),
        );

        let response: CmcResponse<Vec<CmcCoin>> = self
            .client
            .fetch(
                LISTINGS_ENDPOINT,
                &[
                    ("start", start.to_string()),
                    ("limit", limit.to_string()),
                    ("convert", "USD".to_string()),
                ],
            )
            .await?;

        Ok(response.data.iter().map(CmcCoin::to_listing).collect())
    }

    /// Top 24h gainers and losers, each list at most `limit` long
    pub async fn fetch_gainers_losers(&self, limit: u32) -> Result<GainersLosers, ProviderError> {
        let limit = limit.clamp(1, MAX_GAINERS_LOSERS_LIMIT);

        let response: CmcResponse<Vec<CmcCoin>> = self
            .client
            .fetch(
                GAINERS_LOSERS_ENDPOINT,
                &[
                    ("limit", limit.to_string()),
                    ("time_period", "24h".to_string()),
                    ("convert", "USD".to_string()),
                ],
            )
            .await?;

        let listings: Vec<CoinListing> = response.data.iter().map(CmcCoin::to_listing).collect();
        Ok(split_gainers_losers(listings, limit as usize))
    }
}

/// Split by the sign of the 24h change; gainers descending, losers ascending
pub fn split_gainers_losers(listings: Vec<CoinListing>, limit: usize) -> GainersLosers {
    let change = |coin: &CoinListing| coin.percent_change_24h.unwrap_or(0.0);

    let (mut gainers, rest): (Vec<CoinListing>, Vec<CoinListing>) =
        listings.into_iter().partition(|coin| change(coin) > 0.0);
    let mut losers: Vec<CoinListing> = rest.into_iter().filter(|coin| change(coin) < 0.0).collect();

    gainers.sort_by(|a, b| change(b).partial_cmp(&change(a)).unwrap_or(Ordering::Equal));
    losers.sort_by(|a, b| change(a).partial_cmp(&change(b)).unwrap_or(Ordering::Equal));
    gainers.truncate(limit);
    losers.truncate(limit);

    GainersLosers { gainers, losers }
}
