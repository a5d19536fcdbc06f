//! ETag Cache - HTTP response caching middleware
//!
//! Serves stored responses to clients presenting a matching validation tag,
//! captures and stores fresh responses under a content fingerprint, and
//! invalidates groups of entries by key pattern. Storage goes through a
//! uniform backend contract over in-process, redis or callback-style stores.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod intercept;
pub mod middleware;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use backend::{Backend, BackendKind, CacheBackend, StoreClient};
pub use cache::{CachePolicy, CacheSettings, ClearPolicy, ResponseCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
