//! Cache Module
//!
//! ETag-validated response caching: request context and key derivation,
//! the stored entry format, per-route policies and the controller driving the
//! read, write and invalidation paths.

mod controller;
mod entry;
mod key;
mod policy;
mod request;


// Re-export public types
pub use controller::{CacheSettings, ClearHook, ReadOutcome, ResponseCache, StoreHook};
pub use entry::{CacheEntry, HeaderField};
pub use key::{fingerprint, TagPattern, TagPrefix};
pub use policy::{CachePolicy, ClearPolicy, Eligibility, ErrorHandler, ErrorHandlers};
pub use request::RequestContext;
