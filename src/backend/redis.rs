//! Redis Backend
//!
//! Drives a multiplexed redis connection with multi-argument commands.

use async_trait::async_trait;
use redis::aio::{ConnectionLike, ConnectionManager};

use super::CacheBackend;
use crate::error::{CacheError, Result};

/// Adapter over an async redis connection, a [`ConnectionManager`] by default.
///
/// The connection is cheap to clone and safe for concurrent commands, so
/// every call works on its own clone.
#[derive(Clone)]
pub struct RedisBackend<C = ConnectionManager> {
    conn: C,
}

impl<C> RedisBackend<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

impl RedisBackend {
    /// Opens a managed connection to `url`.
    pub async fn connect(url: &str) -> Result<ConnectionManager> {
        let client = redis::Client::open(url).map_err(|e| CacheError::backend("connect", e))?;
        client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::backend("connect", e))
    }
}

#[async_trait]
impl<C> CacheBackend for RedisBackend<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::backend("get", e))?;
        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::backend("set", e))?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut conn = self.conn.clone();
        // Each key becomes its own DEL argument
        let removed: u64 = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::backend("del", e))?;
        Ok(removed)
    }

    async fn find_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::backend("keys", e))?;
        Ok(keys)
    }
}
