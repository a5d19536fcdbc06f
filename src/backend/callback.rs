//! Callback Backend
//!
//! Bridges clients that report completion through an error-first callback
//! into futures, one oneshot channel per call.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::CacheBackend;
use crate::error::{BoxError, CacheError, Result};

/// Completion callback handed to a [`CallbackClient`] call.
pub type Callback<T> = Box<dyn FnOnce(std::result::Result<T, BoxError>) + Send>;

/// Store client with an error-first callback calling convention.
///
/// Implementations must invoke each callback at most once; they may do so
/// synchronously or from another thread.
pub trait CallbackClient: Send + Sync {
    fn get(&self, key: &str, callback: Callback<Option<String>>);

    fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64, callback: Callback<()>);

    fn del(&self, keys: &[String], callback: Callback<u64>);

    fn keys(&self, pattern: &str, callback: Callback<Vec<String>>);
}

/// Adapter over a shared [`CallbackClient`].
#[derive(Clone)]
pub struct CallbackBackend {
    client: Arc<dyn CallbackClient>,
}

impl CallbackBackend {
    pub fn new(client: Arc<dyn CallbackClient>) -> Self {
        Self { client }
    }
}

/// Starts a callback-style call and waits for its completion.
async fn bridge<T, F>(operation: &'static str, start: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(Callback<T>),
{
    let (tx, rx) = oneshot::channel();
    start(Box::new(move |result| {
        // Receiver gone means the caller stopped waiting
        let _ = tx.send(result);
    }));

    match rx.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CacheError::backend(operation, err)),
        Err(_) => Err(CacheError::backend(
            operation,
            "client dropped the callback without invoking it",
        )),
    }
}

#[async_trait]
impl CacheBackend for CallbackBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        bridge("get", |cb| self.client.get(key, cb)).await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        bridge("set", |cb| self.client.set_ex(key, value, ttl_seconds, cb)).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        bridge("del", |cb| self.client.del(keys, cb)).await
    }

    async fn find_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        bridge("keys", |cb| self.client.keys(pattern, cb)).await
    }
}
