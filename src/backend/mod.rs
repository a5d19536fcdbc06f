//! Backend Adapter Module
//!
//! Normalizes key-value store clients with different calling conventions into
//! one asynchronous contract used by the cache controller.

mod callback;
mod memory;
mod redis;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{CacheError, Result};

pub use callback::{Callback, CallbackBackend, CallbackClient};
pub use memory::{MemoryBackend, MemoryStore};
pub use self::redis::RedisBackend;

// == Backend Contract ==
/// Uniform asynchronous store contract.
///
/// Every failure of the underlying client is reported as [`CacheError::Backend`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetches the value stored under `key`; `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key` in a single write that expires after `ttl_seconds`.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// Removes `keys`, returning how many were actually deleted.
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// Lists stored keys matching a glob `pattern`, in no particular order.
    async fn find_by_pattern(&self, pattern: &str) -> Result<Vec<String>>;
}

// == Backend Kind ==
/// Tag selecting which backend variant is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Redis,
    Callback,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "redis" => Ok(BackendKind::Redis),
            "callback" => Ok(BackendKind::Callback),
            other => Err(CacheError::Configuration(format!(
                "unsupported backend '{}', expected one of: memory, redis, callback",
                other
            ))),
        }
    }
}

// == Store Client Handle ==
/// Long-lived, externally owned store connection handed to [`Backend::new`].
#[derive(Clone)]
pub enum StoreClient {
    Memory(Arc<RwLock<MemoryStore>>),
    Redis(::redis::aio::ConnectionManager),
    Callback(Arc<dyn CallbackClient>),
}

impl StoreClient {
    fn kind(&self) -> BackendKind {
        match self {
            StoreClient::Memory(_) => BackendKind::Memory,
            StoreClient::Redis(_) => BackendKind::Redis,
            StoreClient::Callback(_) => BackendKind::Callback,
        }
    }
}

// == Backend ==
/// Closed set of backend variants, chosen once at construction.
pub enum Backend {
    Memory(MemoryBackend),
    Redis(RedisBackend),
    Callback(CallbackBackend),
}

impl Backend {
    /// Builds the variant named by `kind` around `client`.
    ///
    /// Fails with [`CacheError::Configuration`] when the client handle is
    /// missing or belongs to a different kind.
    pub fn new(kind: BackendKind, client: Option<StoreClient>) -> Result<Self> {
        let client = client.ok_or_else(|| {
            CacheError::Configuration(format!("{:?} backend requires a client handle", kind))
        })?;

        if client.kind() != kind {
            return Err(CacheError::Configuration(format!(
                "client handle for {:?} backend cannot drive a {:?} backend",
                client.kind(),
                kind
            )));
        }

        Ok(match client {
            StoreClient::Memory(store) => Backend::Memory(MemoryBackend::new(store)),
            StoreClient::Redis(conn) => Backend::Redis(RedisBackend::new(conn)),
            StoreClient::Callback(client) => Backend::Callback(CallbackBackend::new(client)),
        })
    }

    /// Parses the kind tag, then behaves like [`Backend::new`].
    pub fn from_tag(tag: &str, client: Option<StoreClient>) -> Result<Self> {
        Self::new(tag.parse()?, client)
    }

    /// Variant this backend was built as.
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Memory(_) => BackendKind::Memory,
            Backend::Redis(_) => BackendKind::Redis,
            Backend::Callback(_) => BackendKind::Callback,
        }
    }

    fn inner(&self) -> &dyn CacheBackend {
        match self {
            Backend::Memory(backend) => backend,
            Backend::Redis(backend) => backend,
            Backend::Callback(backend) => backend,
        }
    }
}

#[async_trait]
impl CacheBackend for Backend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner().get(key).await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.inner().set_with_expiry(key, value, ttl_seconds).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.inner().delete(keys).await
    }

    async fn find_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        self.inner().find_by_pattern(pattern).await
    }
}
