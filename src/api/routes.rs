//! API Routes
//!
//! Configures the Axum router with the catalog endpoints and their cache
//! middleware.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{delete_item, get_item, health_handler, list_items, put_item, AppState};
use crate::cache::{CachePolicy, ClearPolicy, TagPattern, TagPrefix};
use crate::middleware::{cache_response, clear_cache, CacheRoute, ClearRoute};

/// Tag prefix shared by all cache entries of one item.
fn item_tag_prefix(id: &str) -> String {
    format!("item-{}:", id)
}

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /items` - List items, cached per path and query
/// - `GET /items/:id` - Fetch one item, cached under `item-<id>:`
/// - `PUT /items/:id` - Create or replace an item, clears list and item entries
/// - `DELETE /items/:id` - Delete an item, clears list and item entries
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cache = state.cache.clone();

    let list_cache = CacheRoute::new(cache.clone(), CachePolicy::new());
    let item_cache = CacheRoute::new(
        cache.clone(),
        CachePolicy::new().with_tag_prefix(TagPrefix::derived(|req| {
            item_tag_prefix(req.param("id").unwrap_or_default())
        })),
    );
    let item_clear = ClearRoute::new(
        cache,
        ClearPolicy::new(TagPattern::derived(|req| {
            let mut patterns = vec!["/items*".to_string()];
            if let Some(id) = req.param("id") {
                patterns.push(format!("{}*", item_tag_prefix(id)));
            }
            patterns
        })),
    );

    Router::new()
        .route(
            "/items",
            get(list_items).route_layer(from_fn_with_state(list_cache, cache_response)),
        )
        .route(
            "/items/:id",
            get(get_item)
                .route_layer(from_fn_with_state(item_cache, cache_response))
                .merge(
                    put(put_item)
                        .delete(delete_item)
                        .route_layer(from_fn_with_state(item_clear, clear_cache)),
                ),
        )
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, BackendKind, MemoryStore, StoreClient};
    use crate::cache::{CacheSettings, ResponseCache};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let store = Arc::new(RwLock::new(MemoryStore::new()));
        let backend = Backend::new(BackendKind::Memory, Some(StoreClient::Memory(store))).unwrap();
        let cache = ResponseCache::new(Arc::new(backend), CacheSettings::default()).unwrap();
        create_router(AppState::new(cache))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_endpoint_sets_etag() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/items")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("etag"));
    }

    #[tokio::test]
    async fn test_get_not_found_is_not_tagged() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/items/99")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!response.headers().contains_key("etag"));
    }

    #[test]
    fn test_item_tag_prefix_is_delimited() {
        assert_eq!(item_tag_prefix("7"), "item-7:");
        assert!(!format!("{}x", item_tag_prefix("70")).starts_with(&item_tag_prefix("7")));
    }
}
