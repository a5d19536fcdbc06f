//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from the
//! in-process store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::MemoryStore;

/// Spawns a background task that periodically purges expired entries.
///
/// Reads already ignore expired entries; this only reclaims their memory.
/// The returned handle can be aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(MemoryStore::new()));
/// let cleanup_handle = spawn_cleanup_task(store.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    store: Arc<RwLock<MemoryStore>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut guard = store.write().await;
                guard.cleanup_expired()
            };

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CacheBackend, MemoryBackend};

    fn shared_store() -> (Arc<RwLock<MemoryStore>>, MemoryBackend) {
        let store = Arc::new(RwLock::new(MemoryStore::new()));
        (store.clone(), MemoryBackend::new(store))
    }

    #[tokio::test]
    async fn test_sweep_reclaims_expired_entries_without_reads() {
        let (store, backend) = shared_store();
        backend.set_with_expiry("express-cache:/a\"1\"", "x", 1).await.unwrap();
        backend.set_with_expiry("express-cache:/b\"2\"", "x", 1).await.unwrap();
        backend.set_with_expiry("express-cache:/c\"3\"", "x", 3600).await.unwrap();

        let handle = spawn_cleanup_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Nothing read the expired keys, so only the sweep can have removed them
        assert_eq!(store.read().await.len(), 1);
        assert_eq!(
            backend.find_by_pattern("express-cache:*").await.unwrap(),
            vec!["express-cache:/c\"3\"".to_string()]
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_leaves_live_entries_readable() {
        let (store, backend) = shared_store();
        backend.set_with_expiry("item-1:\"t\"", "cached", 3600).await.unwrap();

        let handle = spawn_cleanup_task(store, 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            backend.get("item-1:\"t\"").await.unwrap().as_deref(),
            Some("cached")
        );
        assert_eq!(backend.find_by_pattern("item-1:*").await.unwrap().len(), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_aborted_sweep_leaves_expired_entries_hidden_but_held() {
        let (store, backend) = shared_store();
        backend.set_with_expiry("k", "v", 1).await.unwrap();

        let handle = spawn_cleanup_task(store.clone(), 1);
        handle.abort();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(handle.is_finished());

        // Expired entries stay in memory until swept, but lookups skip them
        assert_eq!(store.read().await.len(), 1);
        assert!(backend.find_by_pattern("*").await.unwrap().is_empty());
    }
}
