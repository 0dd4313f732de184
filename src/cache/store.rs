/// Storage seam for the read-through cache
///
/// Stores hold JSON text with an absolute expiry. An entry is absent once
/// `now > expires_at`; nothing is evicted for any other reason.
use crate::errors::CacheError;
use async_trait::async_trait;

/// Longest TTL a store honours (ten years); larger values are clamped
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[async_trait]
pub trait CacheStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Live value for `key`, `None` when missing or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Insert or replace; expiry is `ttl_secs` (at most [`MAX_TTL_SECS`]) from now
    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Physically drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<usize, CacheError>;

    /// Stored entries, including expired ones not yet purged
    async fn len(&self) -> Result<usize, CacheError>;
}
