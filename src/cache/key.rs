//! Cache Key Module
//!
//! Tag prefix and key pattern derivation, and the content fingerprint used as
//! the store-side validation tag.
//!
//! Keys are laid out as `key_prefix + tag_prefix + tag`.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use super::RequestContext;

// == Fingerprint ==
/// Strong validation tag of a response body: `"<len hex>-<digest>"`.
///
/// The digest is the first 27 characters of the base64 SHA-256 of the body.
pub fn fingerprint(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    let encoded = STANDARD.encode(digest);
    format!("\"{:x}-{}\"", body.len(), &encoded[..27])
}

// == Tag Prefix ==
type PrefixFn = dyn Fn(&RequestContext) -> String + Send + Sync;

/// How a route derives the request-scoped part of its cache keys.
#[derive(Clone, Default)]
pub enum TagPrefix {
    /// Request path followed by the canonical query (see
    /// [`RequestContext::canonical_query`]).
    #[default]
    RequestPath,
    Fixed(String),
    Derived(Arc<PrefixFn>),
}

impl TagPrefix {
    pub fn fixed(prefix: impl Into<String>) -> Self {
        TagPrefix::Fixed(prefix.into())
    }

    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&RequestContext) -> String + Send + Sync + 'static,
    {
        TagPrefix::Derived(Arc::new(f))
    }

    pub fn resolve(&self, request: &RequestContext) -> String {
        match self {
            TagPrefix::RequestPath => {
                format!("{}{}", request.path(), request.canonical_query())
            }
            TagPrefix::Fixed(prefix) => prefix.clone(),
            TagPrefix::Derived(f) => f(request),
        }
    }
}

impl fmt::Debug for TagPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagPrefix::RequestPath => f.write_str("RequestPath"),
            TagPrefix::Fixed(prefix) => f.debug_tuple("Fixed").field(prefix).finish(),
            TagPrefix::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

// == Tag Pattern ==
type PatternFn = dyn Fn(&RequestContext) -> Vec<String> + Send + Sync;

/// Glob fragments (appended to the key prefix) naming entries to invalidate.
#[derive(Clone)]
pub enum TagPattern {
    Fixed(Vec<String>),
    Derived(Arc<PatternFn>),
}

impl TagPattern {
    pub fn fixed<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        TagPattern::Fixed(patterns.into_iter().map(Into::into).collect())
    }

    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&RequestContext) -> Vec<String> + Send + Sync + 'static,
    {
        TagPattern::Derived(Arc::new(f))
    }

    /// Fragments for this request, empty ones dropped.
    pub fn resolve(&self, request: &RequestContext) -> Vec<String> {
        let fragments = match self {
            TagPattern::Fixed(patterns) => patterns.clone(),
            TagPattern::Derived(f) => f(request),
        };
        fragments.into_iter().filter(|p| !p.is_empty()).collect()
    }
}

impl From<&str> for TagPattern {
    fn from(pattern: &str) -> Self {
        TagPattern::fixed([pattern])
    }
}

impl From<Vec<String>> for TagPattern {
    fn from(patterns: Vec<String>) -> Self {
        TagPattern::Fixed(patterns)
    }
}

impl fmt::Debug for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagPattern::Fixed(patterns) => f.debug_tuple("Fixed").field(patterns).finish(),
            TagPattern::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}
