pub mod apis;
pub mod arguments;
pub mod cache;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod logger;
pub mod paths;
pub mod scheduler;
pub mod votes;

pub use errors::{CacheError, GatewayError, ProviderError, QueueError, VoteError};
pub use gateway::{Gateway, GatewayResponse, GatewayStatus};
