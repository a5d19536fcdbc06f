//! Configuration Module
//!
//! Handles loading and managing server and cache configuration from environment variables.

use std::env;

use crate::cache::CacheSettings;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend kind tag (`memory`, `redis`)
    pub backend: String,
    /// Connection URL used by the redis backend
    pub redis_url: String,
    /// Namespace prepended to every cache key
    pub key_prefix: String,
    /// Lifetime of stored responses in seconds
    pub ttl: u64,
    /// Request header carrying the client's validation tag
    pub request_header: String,
    /// Response header receiving the computed fingerprint
    pub response_header: String,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweep interval for the in-process store, in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - Backend kind (default: memory)
    /// - `REDIS_URL` - Redis connection URL (default: redis://127.0.0.1:6379)
    /// - `CACHE_KEY_PREFIX` - Key namespace (default: express-cache:)
    /// - `CACHE_TTL` - Entry lifetime in seconds (default: 60)
    /// - `CACHE_REQUEST_HEADER` - Validation header read from requests (default: if-none-match)
    /// - `CACHE_RESPONSE_HEADER` - Validation header set on responses (default: etag)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("CACHE_BACKEND").unwrap_or(defaults.backend),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            ttl: env::var("CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ttl),
            request_header: env::var("CACHE_REQUEST_HEADER").unwrap_or(defaults.request_header),
            response_header: env::var("CACHE_RESPONSE_HEADER")
                .unwrap_or(defaults.response_header),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Cache controller settings carried by this configuration.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            key_prefix: self.key_prefix.clone(),
            ttl_seconds: self.ttl,
            request_header: self.request_header.clone(),
            response_header: self.response_header.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let settings = CacheSettings::default();
        Self {
            backend: "memory".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: settings.key_prefix,
            ttl: settings.ttl_seconds,
            request_header: settings.request_header,
            response_header: settings.response_header,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}
