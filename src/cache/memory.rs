/// In-process cache store
use super::store::{CacheStore, MAX_TTL_SECS};
use crate::errors::CacheError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let data = self.data.read();
        Ok(data
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs.min(MAX_TTL_SECS));
        self.data
            .write()
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired(now));
        Ok(before - data.len())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.data.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_present_then_absent_after_ttl() {
        let store = MemoryStore::new();
        store.set("top_coins_1_100", "[1,2]".to_string(), 1).await.unwrap();
        assert_eq!(store.get("top_coins_1_100").await.unwrap().as_deref(), Some("[1,2]"));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.get("top_coins_1_100").await.unwrap(), None);

        // Still stored until swept
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_overwrites_and_delete_removes() {
        let store = MemoryStore::new();
        store.set("k", "\"a\"".to_string(), 60).await.unwrap();
        store.set("k", "\"b\"".to_string(), 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("\"b\""));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_huge_ttl_is_clamped() {
        let store = MemoryStore::new();
        store.set("k", "1".to_string(), u64::MAX).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }
}
