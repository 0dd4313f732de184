/// Read-through TTL cache
///
/// [`ReadThroughCache`] sits in front of a [`CacheStore`] and stores typed
/// values as JSON. `get_or_load` serves hits from the store and calls the
/// loader on a miss, storing the result with the caller's TTL.
///
/// A store failure never fails a request: it is logged and treated as a miss.
/// Loader errors are returned to the caller untouched and nothing is stored.
pub mod memory;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::CacheStore;

use crate::config::CacheConfig;
use crate::errors::CacheError;
use crate::logger::{self, LogTag};
use crate::paths;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Suffix of the shadow key holding the last good value of a key
pub const STALE_SUFFIX: &str = ":stale";

pub fn stale_key(key: &str) -> String {
    format!("{}{}", key, STALE_SUFFIX)
}

/// Open the store selected by `config.backend`
pub fn open_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "sqlite" => {
            let path = paths::resolve_or_default(&config.sqlite_path, paths::get_cache_db_path());
            Ok(Arc::new(SqliteStore::open(&path)?))
        }
        other => Err(CacheError::Unavailable(format!("unknown cache backend '{}'", other))),
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub store_errors: u64,
    /// Misses answered by another caller's in-flight load
    pub coalesced: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Type-erased `Result<T, E>` of a finished load, shared with waiting callers
type LoadOutcome = Arc<dyn Any + Send + Sync>;

/// A load in progress for one key; waiters watch for its outcome
struct InflightLoad {
    outcome: watch::Receiver<Option<LoadOutcome>>,
}

type InflightMap = Mutex<HashMap<String, Arc<InflightLoad>>>;

/// Removes the leader's slot when its load finishes or its future is dropped
struct InflightGuard<'a> {
    inflight: &'a InflightMap,
    key: &'a str,
    slot: Arc<InflightLoad>,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        // A newer leader may own the key by now
        if inflight
            .get(self.key)
            .map_or(false, |current| Arc::ptr_eq(current, &self.slot))
        {
            inflight.remove(self.key);
        }
    }
}

enum Role {
    Leader(watch::Sender<Option<LoadOutcome>>, Arc<InflightLoad>),
    Waiter(watch::Receiver<Option<LoadOutcome>>),
}

/// Wait for the leader's outcome; `None` when the leader was dropped first
async fn wait_for_outcome(mut outcome: watch::Receiver<Option<LoadOutcome>>) -> Option<LoadOutcome> {
    loop {
        let current = outcome.borrow().clone();
        if current.is_some() {
            return current;
        }
        if outcome.changed().await.is_err() {
            return outcome.borrow().clone();
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    store_errors: AtomicU64,
    coalesced: AtomicU64,
}

pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    coalesce_misses: bool,
    stale_ttl_secs: u64,
    inflight: InflightMap,
    counters: Counters,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            coalesce_misses: false,
            stale_ttl_secs: 0,
            inflight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Collapse concurrent misses on one key into a single loader call
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_misses = enabled;
        self
    }

    /// Keep a `<key>:stale` copy of every successful load for `secs` (0 = off)
    pub fn with_stale_ttl(mut self, secs: u64) -> Self {
        self.stale_ttl_secs = secs;
        self
    }

    pub fn from_config(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self::new(store)
            .with_coalescing(config.coalesce_misses)
            .with_stale_ttl(config.stale_ttl_secs)
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Typed lookup; store and decode failures read as absent
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                self.counters.store_errors.fetch_add(1, Ordering::Relaxed);
                logger::warning(
                    LogTag::Cache,
                    &format!("Cache read failed for '{}', treating as miss: {}", key, e),
                );
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("Cached value for '{}' could not be decoded: {}", key, e),
                );
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store.set(key, raw, ttl_secs).await.map_err(|e| {
            self.counters.store_errors.fetch_add(1, Ordering::Relaxed);
            e
        })
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key).await
    }

    /// Last good value written by a successful load, if still retained
    pub async fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if self.stale_ttl_secs == 0 {
            return None;
        }
        self.get(&stale_key(key)).await
    }

    /// Serve `key` from the store, calling `loader` on a miss
    ///
    /// With coalescing on, concurrent misses on one key share a single
    /// loader call and all receive its outcome, error included.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl_secs: u64, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            logger::verbose(LogTag::Cache, &format!("HIT {}", key));
            return Ok(value);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        logger::debug(LogTag::Cache, &format!("MISS {}", key));

        if !self.coalesce_misses {
            return self.load_and_store(key, ttl_secs, loader).await;
        }

        loop {
            let role = {
                let mut inflight = self.inflight.lock();
                match inflight.get(key) {
                    Some(slot) => Role::Waiter(slot.outcome.clone()),
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        let slot = Arc::new(InflightLoad { outcome: receiver });
                        inflight.insert(key.to_string(), slot.clone());
                        Role::Leader(sender, slot)
                    }
                }
            };

            match role {
                Role::Leader(sender, slot) => {
                    let _guard = InflightGuard {
                        inflight: &self.inflight,
                        key,
                        slot,
                    };
                    let result = self.load_and_store(key, ttl_secs, loader).await;
                    let outcome: LoadOutcome = Arc::new(result.clone());
                    let _ = sender.send(Some(outcome));
                    return result;
                }
                Role::Waiter(receiver) => match wait_for_outcome(receiver).await {
                    Some(outcome) => {
                        if let Some(result) = outcome.downcast_ref::<Result<T, E>>() {
                            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                            return result.clone();
                        }
                        // Same key loaded as a different type
                        return self.load_and_store(key, ttl_secs, loader).await;
                    }
                    None => {
                        // Leader was cancelled; it may still have stored a value
                        if let Some(value) = self.get::<T>(key).await {
                            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                            return Ok(value);
                        }
                        logger::debug(
                            LogTag::Cache,
                            &format!("Load of {} abandoned by its caller, retrying", key),
                        );
                    }
                },
            }
        }
    }

    /// Loads currently shared by coalesced callers
    pub fn inflight_loads(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Load unconditionally and overwrite the entry (background repriming)
    pub async fn refresh<T, E, F, Fut>(&self, key: &str, ttl_secs: u64, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.load_and_store(key, ttl_secs, loader).await
    }

    async fn load_and_store<T, E, F, Fut>(&self, key: &str, ttl_secs: u64, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.counters.loads.fetch_add(1, Ordering::Relaxed);
        let value = match loader().await {
            Ok(value) => value,
            Err(e) => {
                self.counters.load_failures.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        if let Err(e) = self.set(key, &value, ttl_secs).await {
            logger::warning(
                LogTag::Cache,
                &format!("Failed to store '{}' (value still returned): {}", key, e),
            );
        }
        if self.stale_ttl_secs > 0 {
            if let Err(e) = self.set(&stale_key(key), &value, self.stale_ttl_secs).await {
                logger::debug(LogTag::Cache, &format!("Failed to store stale copy of '{}': {}", key, e));
            }
        }

        Ok(value)
    }

    pub async fn purge_expired(&self) -> Result<usize, CacheError> {
        let purged = self.store.purge_expired().await?;
        if purged > 0 {
            logger::debug(LogTag::Cache, &format!("Purged {} expired entries", purged));
        }
        Ok(purged)
    }

    pub async fn entry_count(&self) -> Option<usize> {
        self.store.len().await.ok()
    }

    pub fn metrics(&self) -> CacheMetrics {
        let c = &self.counters;
        CacheMetrics {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            loads: c.loads.load(Ordering::Relaxed),
            load_failures: c.load_failures.load(Ordering::Relaxed),
            store_errors: c.store_errors.load(Ordering::Relaxed),
            coalesced: c.coalesced.load(Ordering::Relaxed),
        }
    }
}
