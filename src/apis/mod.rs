/// External market-data providers
///
/// `client` is the HTTP seam, `queue` throttles calls per provider,
/// `provider` ties both together, and each provider module adapts one API.
pub mod client;
pub mod coingecko;
pub mod coinmarketcap;
pub mod dexscreener;
pub mod manager;
pub mod provider;
pub mod queue;
pub mod stats;
pub mod types;

pub use client::{HttpClient, HttpRequest, HttpResponse, Transport};
pub use manager::{ApiManager, ApiManagerStats};
pub use queue::{DispatchQueues, ProviderQueue, QueueSettings, QueueStatus};
pub use stats::ApiStats;
pub use types::{
    CoinListing, GainersLosers, SearchResult, TokenAnalysis, TokenPool, TokenProfile, TrendingCoin,
};
