//! In-Process Store
//!
//! HashMap storage with per-key expiry and glob key enumeration, plus the
//! adapter exposing it through [`CacheBackend`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use glob::Pattern;
use tokio::sync::RwLock;

use super::CacheBackend;
use crate::error::{CacheError, Result};

// == Stored Value ==
/// A single stored value with its expiry metadata.
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// The stored value
    pub value: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl StoredValue {
    /// Creates a value that expires `ttl_seconds` from now.
    pub fn new(value: String, ttl_seconds: u64) -> Self {
        Self {
            value,
            expires_at: current_timestamp_ms().saturating_add(ttl_seconds.saturating_mul(1000)),
        }
    }

    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Memory Store ==
/// Key-value storage with TTL expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns the live value under `key`, dropping it if it has expired.
    pub fn get(&mut self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    // == Set ==
    /// Stores or overwrites `key`, resetting its expiry.
    pub fn set(&mut self, key: String, value: String, ttl_seconds: u64) {
        self.entries.insert(key, StoredValue::new(value, ttl_seconds));
    }

    // == Delete ==
    /// Removes each key, returning how many live entries were removed.
    pub fn delete<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) -> u64 {
        keys.into_iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|entry| !entry.is_expired())
            .count() as u64
    }

    // == Keys ==
    /// Lists live keys matching a glob pattern (`*`, `?`, `[...]`).
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = Pattern::new(pattern).map_err(|e| CacheError::backend("keys", e))?;

        Ok(self
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    /// Returns the number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Memory Backend ==
/// Adapter over a shared [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryBackend {
    pub fn new(store: Arc<RwLock<MemoryStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // Write lock: expired entries are dropped on read
        Ok(self.store.write().await.get(key))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.store
            .write()
            .await
            .set(key.to_string(), value.to_string(), ttl_seconds);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        Ok(self
            .store
            .write()
            .await
            .delete(keys.iter().map(String::as_str)))
    }

    async fn find_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        self.store.read().await.keys(pattern)
    }
}
