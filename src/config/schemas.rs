/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is declared with the `config_struct!` macro, which provides
/// embedded defaults and serde support with `#[serde(default)]`, so a config
/// file only has to name the values it changes.
use crate::config_struct;

// ============================================================================
// PROVIDER CONFIGURATION
// ============================================================================

config_struct! {
    /// CoinMarketCap-style listings provider
    pub struct CoinMarketCapConfig {
        enabled: bool = true,
        base_url: String = "https://pro-api.coinmarketcap.com".to_string(),
        /// Sent as the `X-CMC_PRO_API_KEY` header; falls back to $CMC_API_KEY
        api_key: String = String::new(),
        /// Minimum spacing between call starts (ms)
        min_interval_ms: u64 = 1500,
        timeout_secs: u64 = 15,
        /// 0 = unbounded queue
        max_queue_depth: usize = 0,
    }
}

config_struct! {
    /// CoinGecko-style markets/trending provider
    pub struct CoinGeckoConfig {
        enabled: bool = true,
        base_url: String = "https://api.coingecko.com/api/v3".to_string(),
        /// Sent as the `x_cg_demo_api_key` query parameter; falls back to $COINGECKO_API_KEY
        api_key: String = String::new(),
        min_interval_ms: u64 = 2000,
        timeout_secs: u64 = 20,
        max_queue_depth: usize = 0,
    }
}

config_struct! {
    /// DexScreener-style pair feed provider (no auth)
    pub struct DexScreenerConfig {
        enabled: bool = true,
        base_url: String = "https://api.dexscreener.com".to_string(),
        min_interval_ms: u64 = 200,
        timeout_secs: u64 = 10,
        max_queue_depth: usize = 0,
    }
}

config_struct! {
    pub struct ProvidersConfig {
        coinmarketcap: CoinMarketCapConfig = CoinMarketCapConfig::default(),
        coingecko: CoinGeckoConfig = CoinGeckoConfig::default(),
        dexscreener: DexScreenerConfig = DexScreenerConfig::default(),
    }
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

config_struct! {
    /// Read-through cache configuration
    pub struct CacheConfig {
        /// "memory" or "sqlite"
        backend: String = "memory".to_string(),
        /// SQLite file for the "sqlite" backend (empty = data dir default)
        sqlite_path: String = String::new(),
        /// Collapse concurrent misses on one key into a single loader call
        coalesce_misses: bool = false,

        top_coins_ttl_secs: u64 = 300,
        trending_ttl_secs: u64 = 300,
        listings_ttl_secs: u64 = 300,
        gainers_losers_ttl_secs: u64 = 300,
        token_pools_ttl_secs: u64 = 120,
        search_ttl_secs: u64 = 600,
        discovery_ttl_secs: u64 = 1800,
        analysis_ttl_secs: u64 = 43_200,
        votes_ttl_secs: u64 = 30,

        /// Lifetime of the `<key>:stale` fallback copy (0 = disabled)
        stale_ttl_secs: u64 = 0,
    }
}

// ============================================================================
// SCHEDULER CONFIGURATION
// ============================================================================

config_struct! {
    /// Background task intervals (fixed delay, measured from the end of a run)
    pub struct SchedulerConfig {
        enabled: bool = true,
        /// Run every task once immediately at startup
        run_on_start: bool = true,

        discovery_interval_secs: u64 = 900,
        analysis_interval_secs: u64 = 21_600,
        reprime_interval_secs: u64 = 300,
        cache_sweep_interval_secs: u64 = 600,

        /// Page size used when repriming hot listing keys
        reprime_per_page: u32 = 100,
        /// Upper bound on tokens analysed per analysis run
        analysis_max_tokens: usize = 25,
    }
}

// ============================================================================
// VOTES CONFIGURATION
// ============================================================================

config_struct! {
    pub struct VotesConfig {
        /// SQLite file for the ledger (empty = data dir default)
        database_path: String = String::new(),
        /// Longest accepted subject id / voter key
        max_key_length: usize = 128,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration
    pub struct Config {
        providers: ProvidersConfig = ProvidersConfig::default(),
        cache: CacheConfig = CacheConfig::default(),
        scheduler: SchedulerConfig = SchedulerConfig::default(),
        votes: VotesConfig = VotesConfig::default(),
    }
}
