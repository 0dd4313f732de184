/// SQLite-backed cache store
///
/// Entries survive restarts; expiry is stored as epoch milliseconds.
use super::store::{CacheStore, MAX_TTL_SECS};
use crate::errors::CacheError;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn unavailable(err: rusqlite::Error) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(unavailable)?;
        logger::debug(
            LogTag::Cache,
            &format!("Opened SQLite cache store at {}", path.display()),
        );
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory().map_err(unavailable)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             CREATE TABLE IF NOT EXISTS cache_entries (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL,
                 expires_at INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);",
        )
        .map_err(unavailable)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at >= ?2",
            params![key, now_ms()],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(unavailable)
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError> {
        let ttl_ms = i64::try_from(ttl_secs.min(MAX_TTL_SECS))
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let expires_at = now_ms().saturating_add(ttl_ms);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, expires_at],
        )
        .map_err(unavailable)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
            .map_err(unavailable)?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM cache_entries WHERE expires_at < ?1",
            params![now_ms()],
        )
        .map_err(unavailable)
    }

    async fn len(&self) -> Result<usize, CacheError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .map_err(unavailable)?;
        Ok(count as usize)
    }
}
