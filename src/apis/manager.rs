/// API manager - owns every provider client and its dispatch queue
///
/// Constructed once by the gateway. Each provider gets exactly one queue, so
/// user requests and background tasks share the same throttle.
use std::sync::Arc;

use crate::config::ProvidersConfig;
use crate::logger::{self, LogTag};

use super::client::Transport;
use super::coingecko::{self, CoinGeckoClient};
use super::coinmarketcap::{self, CoinMarketCapClient};
use super::dexscreener::{self, DexScreenerClient};
use super::provider::{ProviderClient, ProviderSettings};
use super::queue::{DispatchQueues, QueueStatus};
use super::stats::ApiStats;

pub struct ApiManager {
    pub coinmarketcap: CoinMarketCapClient,
    pub coingecko: CoinGeckoClient,
    pub dexscreener: DexScreenerClient,
    queues: DispatchQueues,
}

impl ApiManager {
    /// Must be called inside a tokio runtime (queue workers are spawned here)
    pub fn new(config: &ProvidersConfig, transport: Arc<dyn Transport>) -> Self {
        logger::info(LogTag::Api, "Initializing API manager");

        let queues = DispatchQueues::new();
        let build = |settings: ProviderSettings| {
            if !settings.enabled {
                logger::warning(
                    LogTag::Api,
                    &format!("{} disabled via configuration", settings.key),
                );
            }
            let queue = queues.register(settings.queue_settings());
            ProviderClient::new(settings, transport.clone(), queue)
        };

        let coinmarketcap = CoinMarketCapClient::new(build(coinmarketcap::provider_settings(
            &config.coinmarketcap,
        )));
        let coingecko = CoinGeckoClient::new(build(coingecko::provider_settings(&config.coingecko)));
        let dexscreener =
            DexScreenerClient::new(build(dexscreener::provider_settings(&config.dexscreener)));

        Self {
            coinmarketcap,
            coingecko,
            dexscreener,
            queues,
        }
    }

    pub fn queues(&self) -> &DispatchQueues {
        &self.queues
    }

    pub fn queue_statuses(&self) -> Vec<QueueStatus> {
        self.queues.statuses()
    }

    /// Get aggregated stats from all API clients
    pub async fn get_all_stats(&self) -> ApiManagerStats {
        ApiManagerStats {
            coinmarketcap: self.coinmarketcap.provider().get_stats().await,
            coingecko: self.coingecko.provider().get_stats().await,
            dexscreener: self.dexscreener.provider().get_stats().await,
        }
    }

    /// Close every queue; pending requests are drained as cancelled
    pub async fn shutdown(&self) {
        self.queues.shutdown_all().await;
    }
}

/// Aggregated stats from all API clients
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiManagerStats {
    pub coinmarketcap: ApiStats,
    pub coingecko: ApiStats,
    pub dexscreener: ApiStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::client::testing::MockTransport;

    #[tokio::test]
    async fn test_one_queue_per_provider() {
        let manager = ApiManager::new(&ProvidersConfig::default(), Arc::new(MockTransport::new()));
        let statuses = manager.queue_statuses();
        let names: Vec<&str> = statuses.iter().map(|s| s.provider.as_str()).collect();
        assert_eq!(names, vec!["coingecko", "coinmarketcap", "dexscreener"]);
        assert_eq!(statuses[1].min_interval_ms, 1500);

        manager.shutdown().await;
        assert!(manager.queue_statuses().iter().all(|s| s.closed));
    }
}
