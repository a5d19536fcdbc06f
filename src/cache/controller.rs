//! Cache Controller
//!
//! Read path (validation tag lookup and replay), write path (fingerprint and
//! store on finalize) and invalidation path (pattern resolution and delete).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use futures::future::try_join_all;
use tracing::{debug, info};

use super::{fingerprint, CacheEntry, CachePolicy, ClearPolicy, Eligibility, ErrorHandlers};
use super::RequestContext;
use crate::backend::CacheBackend;
use crate::error::{CacheError, Result};
use crate::intercept::{CapturedBody, FinalizeHook, ResponseSink};

// == Settings ==
/// Controller-wide settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Namespace prepended to every key
    pub key_prefix: String,
    /// Lifetime of stored entries, enforced by the store
    pub ttl_seconds: u64,
    /// Request header carrying the client's validation tag
    pub request_header: String,
    /// Response header receiving the computed fingerprint
    pub response_header: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key_prefix: "express-cache:".to_string(),
            ttl_seconds: 60,
            request_header: "if-none-match".to_string(),
            response_header: "etag".to_string(),
        }
    }
}

/// Settings after validation.
#[derive(Debug)]
struct Keyspace {
    key_prefix: String,
    ttl_seconds: u64,
    request_header: HeaderName,
    response_header: HeaderName,
}

fn header_name(name: &str, setting: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| {
        CacheError::Configuration(format!("invalid {} header name '{}'", setting, name))
    })
}

// == Read Outcome ==
/// Result of the read path for one request.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A stored response matched the client's tag; replay it and stop.
    Hit(CacheEntry),
    /// Nothing usable was stored; continue downstream with this tag prefix.
    Miss { tag_prefix: String },
    /// The lookup failed and the read handler swallowed the error; stop.
    Halted,
}

// == Response Cache ==
/// Shared controller; cheap to clone, holds no per-request state.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    keyspace: Arc<Keyspace>,
    handlers: ErrorHandlers,
}

impl ResponseCache {
    /// Validates `settings` and binds them to `backend`.
    pub fn new(backend: Arc<dyn CacheBackend>, settings: CacheSettings) -> Result<Self> {
        if settings.ttl_seconds == 0 {
            return Err(CacheError::Configuration(
                "ttl_seconds must be greater than zero".to_string(),
            ));
        }

        let keyspace = Keyspace {
            request_header: header_name(&settings.request_header, "request")?,
            response_header: header_name(&settings.response_header, "response")?,
            key_prefix: settings.key_prefix,
            ttl_seconds: settings.ttl_seconds,
        };

        Ok(Self {
            backend,
            keyspace: Arc::new(keyspace),
            handlers: ErrorHandlers::default(),
        })
    }

    pub fn with_error_handlers(mut self, handlers: ErrorHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn key_prefix(&self) -> &str {
        &self.keyspace.key_prefix
    }

    /// Full store key for a tag under a tag prefix.
    pub fn key(&self, tag_prefix: &str, tag: &str) -> String {
        format!("{}{}{}", self.keyspace.key_prefix, tag_prefix, tag)
    }

    // == Read Path ==
    /// Derives the tag prefix and, when the client sent a validation tag,
    /// looks up the stored response.
    ///
    /// Store and decode failures go to the read handler; a re-raised error is
    /// returned, a swallowed one yields [`ReadOutcome::Halted`].
    pub async fn read(&self, policy: &CachePolicy, request: &RequestContext) -> Result<ReadOutcome> {
        let tag_prefix = policy.tag_prefix.resolve(request);

        let token = request
            .header(self.keyspace.request_header.as_str())
            .filter(|token| !token.is_empty());
        let Some(token) = token else {
            debug!("No validation tag on {}, skipping lookup", request.path());
            return Ok(ReadOutcome::Miss { tag_prefix });
        };

        let key = self.key(&tag_prefix, token);
        match self.lookup(&key).await {
            Ok(Some(entry)) => {
                debug!("Cache hit for {}", key);
                Ok(ReadOutcome::Hit(entry))
            }
            Ok(None) => {
                debug!("Cache miss for {}", key);
                Ok(ReadOutcome::Miss { tag_prefix })
            }
            Err(err) => {
                (self.handlers.read)(err, request)?;
                Ok(ReadOutcome::Halted)
            }
        }
    }

    async fn lookup(&self, key: &str) -> Result<Option<CacheEntry>> {
        match self.backend.get(key).await? {
            // An empty stored value is treated like an absent one
            Some(raw) if !raw.is_empty() => Ok(Some(CacheEntry::decode(&raw)?)),
            _ => Ok(None),
        }
    }

    // == Write Path ==
    /// Hook storing the finalized response under its fingerprint.
    pub fn store_hook(
        &self,
        policy: &CachePolicy,
        request: RequestContext,
        tag_prefix: String,
    ) -> StoreHook {
        StoreHook {
            cache: self.clone(),
            eligibility: policy.eligibility.clone(),
            tag_prefix,
            request,
        }
    }

    async fn store(&self, sink: &mut dyn ResponseSink, tag_prefix: &str, body: &str) -> Result<()> {
        let tag = fingerprint(body.as_bytes());
        let value = HeaderValue::from_str(&tag).map_err(|e| CacheError::backend("set", e))?;
        sink.headers_mut()
            .insert(self.keyspace.response_header.clone(), value);

        let entry = CacheEntry::snapshot(sink.status(), sink.headers(), body.to_string());
        let key = self.key(tag_prefix, &tag);

        self.backend
            .set_with_expiry(&key, &entry.encode()?, self.keyspace.ttl_seconds)
            .await?;
        debug!("Stored {} for {}s", key, self.keyspace.ttl_seconds);
        Ok(())
    }

    // == Invalidation Path ==
    /// Hook clearing every key matched by the policy's patterns, or `None`
    /// when no pattern resolves for this request.
    pub fn clear_hook(&self, policy: &ClearPolicy, request: RequestContext) -> Option<ClearHook> {
        let patterns: Vec<String> = policy
            .tag_pattern
            .resolve(&request)
            .into_iter()
            .map(|fragment| format!("{}{}", self.keyspace.key_prefix, fragment))
            .collect();

        if patterns.is_empty() {
            return None;
        }

        Some(ClearHook {
            cache: self.clone(),
            eligibility: policy.eligibility.clone(),
            patterns,
            request,
        })
    }

    /// Looks up all patterns concurrently and returns the union of matching
    /// keys, first occurrence kept.
    pub async fn matching_keys(&self, patterns: &[String]) -> Result<Vec<String>> {
        let found = try_join_all(
            patterns
                .iter()
                .map(|pattern| self.backend.find_by_pattern(pattern)),
        )
        .await?;

        let mut seen = HashSet::new();
        Ok(found
            .into_iter()
            .flatten()
            .filter(|key| seen.insert(key.clone()))
            .collect())
    }

    /// Deletes the union of keys matched by `patterns`.
    pub async fn clear(&self, patterns: &[String]) -> Result<u64> {
        let keys = self.matching_keys(patterns).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let removed = self.backend.delete(&keys).await?;
        info!("Invalidated {} cached entries ({} matched)", removed, keys.len());
        Ok(removed)
    }
}

// == Store Hook ==
/// Write-path hook for one request.
pub struct StoreHook {
    cache: ResponseCache,
    eligibility: Eligibility,
    tag_prefix: String,
    request: RequestContext,
}

#[async_trait]
impl FinalizeHook for StoreHook {
    async fn on_finalize(
        self: Box<Self>,
        body: CapturedBody,
        sink: &mut dyn ResponseSink,
    ) -> Result<()> {
        let status = sink.status();
        if !self.eligibility.allows(status) {
            debug!("Status {} not eligible for caching {}", status, self.request.path());
            return Ok(());
        }

        // Stored entries keep the body as text, so binary bodies are not cached
        let Some(text) = body.as_text() else {
            debug!(
                "Body of {} is not valid UTF-8 ({} bytes), not caching",
                self.request.path(),
                body.as_bytes().len()
            );
            return Ok(());
        };

        match self.cache.store(sink, &self.tag_prefix, text).await {
            Ok(()) => Ok(()),
            Err(err) => (self.cache.handlers.write)(err, &self.request),
        }
    }
}

// == Clear Hook ==
/// Invalidation hook for one request.
pub struct ClearHook {
    cache: ResponseCache,
    eligibility: Eligibility,
    patterns: Vec<String>,
    request: RequestContext,
}

impl ClearHook {
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[async_trait]
impl FinalizeHook for ClearHook {
    async fn on_finalize(
        self: Box<Self>,
        _body: CapturedBody,
        sink: &mut dyn ResponseSink,
    ) -> Result<()> {
        let status = sink.status();
        if !self.eligibility.allows(status) {
            debug!("Status {} not eligible for clearing {:?}", status, self.patterns);
            return Ok(());
        }

        match self.cache.clear(&self.patterns).await {
            Ok(_) => Ok(()),
            Err(err) => (self.cache.handlers.clear)(err, &self.request),
        }
    }
}
