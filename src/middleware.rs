//! Router Middleware
//!
//! Mounts the cache controller on axum routes. Install with
//! `route_layer(from_fn_with_state(..))` so route parameters are available:
//!
//! ```ignore
//! let cache = ResponseCache::new(backend, CacheSettings::default())?;
//! Router::new()
//!     .route("/items", get(list_items).route_layer(from_fn_with_state(
//!         CacheRoute::new(cache.clone(), CachePolicy::new()),
//!         cache_response,
//!     )))
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tracing::{error, warn};

use crate::cache::{CachePolicy, ClearPolicy, ReadOutcome, RequestContext, ResponseCache};
use crate::error::Result;
use crate::intercept::{BodyInterceptor, BufferedResponse, FinalizeHook, ResponseSink};

// == Route States ==
/// Middleware state for a cached route.
#[derive(Clone)]
pub struct CacheRoute {
    cache: ResponseCache,
    policy: Arc<CachePolicy>,
}

impl CacheRoute {
    pub fn new(cache: ResponseCache, policy: CachePolicy) -> Self {
        Self {
            cache,
            policy: Arc::new(policy),
        }
    }
}

/// Middleware state for a route that invalidates cached entries.
#[derive(Clone)]
pub struct ClearRoute {
    cache: ResponseCache,
    policy: Arc<ClearPolicy>,
}

impl ClearRoute {
    pub fn new(cache: ResponseCache, policy: ClearPolicy) -> Self {
        Self {
            cache,
            policy: Arc::new(policy),
        }
    }
}

// == Cache Middleware ==
/// Serves a stored response when the client's validation tag matches one,
/// otherwise runs the handler and stores what it produced.
pub async fn cache_response(
    State(route): State<CacheRoute>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let (mut parts, body) = request.into_parts();
    let context = RequestContext::from_parts(&mut parts).await;

    let tag_prefix = match route.cache.read(&route.policy, &context).await? {
        ReadOutcome::Hit(entry) => {
            let mut sink = BufferedResponse::new();
            entry.replay(&mut sink).await?;
            return Ok(sink.into_response());
        }
        ReadOutcome::Miss { tag_prefix } => tag_prefix,
        ReadOutcome::Halted => {
            warn!("Cache read failed for {}, request halted", context.path());
            return Ok(StatusCode::SERVICE_UNAVAILABLE.into_response());
        }
    };

    let hook = route.cache.store_hook(&route.policy, context, tag_prefix);
    let response = next.run(Request::from_parts(parts, body)).await;
    Ok(intercept(response, hook).await)
}

// == Clear Middleware ==
/// Runs the handler, then invalidates entries matching the route's patterns
/// if the outcome is eligible.
pub async fn clear_cache(State(route): State<ClearRoute>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let context = RequestContext::from_parts(&mut parts).await;

    let hook = route.cache.clear_hook(&route.policy, context);
    let response = next.run(Request::from_parts(parts, body)).await;

    match hook {
        Some(hook) => intercept(response, hook).await,
        None => response,
    }
}

// == Interception ==
/// Streams `response` through a [`BodyInterceptor`] running `hook`.
///
/// Errors re-raised by the hook are logged; the response itself is still
/// returned.
pub async fn intercept(response: Response, hook: impl FinalizeHook + 'static) -> Response {
    let (parts, body) = response.into_parts();
    let mut sink = BodyInterceptor::new(BufferedResponse::from_parts(&parts), hook);

    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let written = match chunk {
            Ok(chunk) => sink.write(chunk).await,
            Err(err) => {
                error!("Response body failed mid-stream: {}", err);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        if let Err(err) = written {
            error!("Response write failed: {}", err);
        }
    }

    if let Err(err) = sink.finalize(None).await {
        error!("Cache update failed after response: {}", err);
    }

    let mut response = sink.into_inner().into_response();
    *response.version_mut() = parts.version;
    *response.extensions_mut() = parts.extensions;
    response
}
