/// External-data gateway
///
/// `Gateway` owns the provider clients (and their dispatch queues), the
/// read-through cache, the vote ledger and the background scheduler. It is
/// built once and shared as `Arc<Gateway>` by request handlers and scheduled
/// tasks alike.
pub mod background;
pub mod keys;
pub mod queries;
pub mod response;

#[cfg(test)]
mod tests;

pub use response::GatewayResponse;

use crate::apis::{ApiManager, ApiManagerStats, HttpClient, QueueStatus, Transport};
use crate::cache::{self, CacheMetrics, CacheStore, ReadThroughCache};
use crate::config::Config;
use crate::errors::{GatewayError, ProviderError};
use crate::logger::{self, LogTag};
use crate::paths;
use crate::scheduler::{Scheduler, TaskStatus};
use crate::votes::VoteLedger;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

pub struct Gateway {
    config: Config,
    apis: ApiManager,
    cache: ReadThroughCache,
    ledger: VoteLedger,
    scheduler: Scheduler,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub backend: String,
    pub entries: Option<usize>,
    pub inflight_loads: usize,
    pub metrics: CacheMetrics,
}

/// Snapshot of every moving part, for health endpoints and `--query status`
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub providers: ApiManagerStats,
    pub queues: Vec<QueueStatus>,
    pub cache: CacheStatus,
    pub scheduler: Vec<TaskStatus>,
}

impl Gateway {
    /// Build the production gateway: reqwest transport, configured cache
    /// backend and the on-disk vote ledger. Must run inside a tokio runtime.
    pub fn new(config: Config) -> Result<Self, GatewayError> {
        let providers = &config.providers;
        let timeout_secs = providers
            .coinmarketcap
            .timeout_secs
            .max(providers.coingecko.timeout_secs)
            .max(providers.dexscreener.timeout_secs);
        let transport = HttpClient::new(timeout_secs).map_err(|message| ProviderError::Network {
            provider: "http".to_string(),
            message,
        })?;

        let store = cache::open_store(&config.cache)?;
        let ledger_path = paths::resolve_or_default(&config.votes.database_path, paths::get_votes_db_path());
        let ledger = VoteLedger::open(&ledger_path, config.votes.max_key_length)?;

        Ok(Self::with_parts(config, Arc::new(transport), store, ledger))
    }

    /// Assemble a gateway from explicit parts
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CacheStore>,
        ledger: VoteLedger,
    ) -> Self {
        let apis = ApiManager::new(&config.providers, transport);
        let cache = ReadThroughCache::from_config(store, &config.cache);

        logger::info(
            LogTag::Gateway,
            &format!(
                "Gateway ready (cache backend: {}, coalesce misses: {}, stale fallback: {}s)",
                cache.backend_name(),
                config.cache.coalesce_misses,
                config.cache.stale_ttl_secs
            ),
        );

        Self {
            config,
            apis,
            cache,
            ledger,
            scheduler: Scheduler::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn apis(&self) -> &ApiManager {
        &self.apis
    }

    pub fn cache(&self) -> &ReadThroughCache {
        &self.cache
    }

    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub async fn status(&self) -> GatewayStatus {
        GatewayStatus {
            providers: self.apis.get_all_stats().await,
            queues: self.apis.queue_statuses(),
            cache: CacheStatus {
                backend: self.cache.backend_name().to_string(),
                entries: self.cache.entry_count().await,
                inflight_loads: self.cache.inflight_loads(),
                metrics: self.cache.metrics(),
            },
            scheduler: self.scheduler.statuses(),
        }
    }

    /// Stop background tasks, then close the provider queues
    pub async fn shutdown(&self) {
        logger::info(LogTag::Gateway, "Shutting down gateway");
        self.scheduler.shutdown().await;
        self.apis.shutdown().await;
    }

    /// Serve `key` through the cache, folding the outcome into an envelope
    ///
    /// On failure the envelope carries the stale copy when one is retained,
    /// otherwise the default data shape.
    async fn cached<T, F, Fut>(&self, key: &str, ttl_secs: u64, loader: F) -> GatewayResponse<T>
    where
        T: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        match self.cache.get_or_load(key, ttl_secs, loader).await {
            Ok(data) => GatewayResponse::ok(data),
            Err(e) => {
                logger::warning(LogTag::Gateway, &format!("{} unavailable: {}", key, e));
                match self.cache.get_stale::<T>(key).await {
                    Some(stale) => {
                        logger::debug(LogTag::Gateway, &format!("Serving stale copy of {}", key));
                        GatewayResponse::failure_with(e.to_string(), stale)
                    }
                    None => GatewayResponse::failure(e.to_string()),
                }
            }
        }
    }
}
