//! Cache Policy Module
//!
//! Per-route options (tag prefix, key patterns, eligibility) and the
//! controller-wide error handlers.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;

use super::{RequestContext, TagPattern, TagPrefix};
use crate::error::{CacheError, Result};

// == Eligibility ==
/// Decides from the final status code whether a response may be cached, or
/// whether a request may clear entries.
#[derive(Clone)]
pub struct Eligibility(Arc<dyn Fn(StatusCode) -> bool + Send + Sync>);

impl Eligibility {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(StatusCode) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Accepts 200..=299.
    pub fn success() -> Self {
        Self::new(|status| status.is_success())
    }

    pub fn allows(&self, status: StatusCode) -> bool {
        (self.0)(status)
    }
}

impl Default for Eligibility {
    fn default() -> Self {
        Self::success()
    }
}

impl fmt::Debug for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Eligibility(..)")
    }
}

// == Route Policies ==
/// Options for a cached route.
#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
    pub tag_prefix: TagPrefix,
    pub eligibility: Eligibility,
}

impl CachePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag_prefix(mut self, tag_prefix: TagPrefix) -> Self {
        self.tag_prefix = tag_prefix;
        self
    }

    pub fn with_eligibility(mut self, eligibility: Eligibility) -> Self {
        self.eligibility = eligibility;
        self
    }
}

/// Options for a route that invalidates cached entries.
#[derive(Debug, Clone)]
pub struct ClearPolicy {
    pub tag_pattern: TagPattern,
    pub eligibility: Eligibility,
}

impl ClearPolicy {
    pub fn new(tag_pattern: impl Into<TagPattern>) -> Self {
        Self {
            tag_pattern: tag_pattern.into(),
            eligibility: Eligibility::default(),
        }
    }

    pub fn with_eligibility(mut self, eligibility: Eligibility) -> Self {
        self.eligibility = eligibility;
        self
    }
}

// == Error Handlers ==
/// Receives a failure and the request it happened on.
///
/// Returning `Ok(())` swallows the error; returning `Err` re-raises it to the
/// surrounding pipeline.
pub type ErrorHandler = Arc<dyn Fn(CacheError, &RequestContext) -> Result<()> + Send + Sync>;

/// One handler per failure class; each re-raises by default.
#[derive(Clone)]
pub struct ErrorHandlers {
    pub read: ErrorHandler,
    pub write: ErrorHandler,
    pub clear: ErrorHandler,
}

fn reraise(err: CacheError, _request: &RequestContext) -> Result<()> {
    Err(err)
}

impl Default for ErrorHandlers {
    fn default() -> Self {
        Self {
            read: Arc::new(reraise),
            write: Arc::new(reraise),
            clear: Arc::new(reraise),
        }
    }
}

impl ErrorHandlers {
    pub fn on_read<F>(mut self, f: F) -> Self
    where
        F: Fn(CacheError, &RequestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.read = Arc::new(f);
        self
    }

    pub fn on_write<F>(mut self, f: F) -> Self
    where
        F: Fn(CacheError, &RequestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.write = Arc::new(f);
        self
    }

    pub fn on_clear<F>(mut self, f: F) -> Self
    where
        F: Fn(CacheError, &RequestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.clear = Arc::new(f);
        self
    }
}
