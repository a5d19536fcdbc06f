//! ETag Cache - demonstration catalog server
//!
//! Serves a small in-memory catalog with cached reads and invalidating writes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use etag_cache::{
    api::create_router,
    backend::{MemoryStore, RedisBackend},
    models::Item,
    spawn_cleanup_task, AppState, Backend, BackendKind, Config, ResponseCache, StoreClient,
};

/// Main entry point for the catalog server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the configured cache backend (starting the sweeper for memory)
/// 4. Build the response cache and seed the catalog
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "etag_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ETag Cache catalog server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={}, key_prefix={}, ttl={}s, port={}",
        config.backend, config.key_prefix, config.ttl, config.server_port
    );

    let kind: BackendKind = config.backend.parse()?;
    let (client, cleanup_handle) = match kind {
        BackendKind::Memory => {
            let store = Arc::new(RwLock::new(MemoryStore::new()));
            let handle = spawn_cleanup_task(store.clone(), config.cleanup_interval);
            (StoreClient::Memory(store), Some(handle))
        }
        BackendKind::Redis => {
            let conn = RedisBackend::connect(&config.redis_url)
                .await
                .with_context(|| format!("connecting to {}", config.redis_url))?;
            (StoreClient::Redis(conn), None)
        }
        BackendKind::Callback => {
            anyhow::bail!("the callback backend needs a client supplied by an embedding application")
        }
    };

    let backend = Backend::new(kind, Some(client))?;
    let cache = ResponseCache::new(Arc::new(backend), config.cache_settings())?;
    info!("{:?} cache backend ready", kind);

    let state = AppState::new(cache);
    state
        .seed([Item::new(1, "Foo", 100), Item::new(2, "Bar", 250)])
        .await;

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}
