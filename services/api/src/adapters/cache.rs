//! services/api/src/adapters/cache.rs
//!
//! This module contains the Redis adapter, which implements the `CacheStore`
//! port from the `core` crate on top of a shared `ConnectionManager`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use scripture_core::ports::{CacheStore, PortError, PortResult};
use std::time::Duration;
use tracing::debug;

/// How many keys a single SCAN step asks Redis to examine.
const SCAN_BATCH: usize = 200;

/// A cache adapter that implements the `CacheStore` port.
///
/// `ConnectionManager` multiplexes one connection and reconnects on its own,
/// so each call works on a cheap clone of it.
#[derive(Clone)]
pub struct RedisCacheAdapter {
    conn: ConnectionManager,
}

impl RedisCacheAdapter {
    /// Opens the connection described by `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

fn cache_error(e: redis::RedisError) -> PortError {
    PortError::Unexpected(format!("cache: {}", e))
}

/// Escapes the characters Redis treats as glob syntax in a MATCH pattern.
pub(crate) fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl CacheStore for RedisCacheAdapter {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(cache_error)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await.map_err(cache_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(cache_error)?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> PortResult<u64> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        // Walk the keyspace with SCAN and delete batch by batch, never holding
        // more than one batch of keys.
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(cache_error)?;

            if !keys.is_empty() {
                let deleted: u64 = conn.del(keys.as_slice()).await.map_err(cache_error)?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(prefix, removed, "Deleted cache keys by prefix");
        Ok(removed)
    }

    async fn flush_all(&self) -> PortResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHALL")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}
