//! API Handlers
//!
//! HTTP request handlers for the catalog endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::cache::ResponseCache;
use crate::error::{CacheError, Result};
use crate::models::{DeleteResponse, HealthResponse, Item, UpsertItemRequest};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Catalog items by id
    pub catalog: Arc<RwLock<BTreeMap<u64, Item>>>,
    /// Response cache mounted on the item routes
    pub cache: ResponseCache,
}

impl AppState {
    /// Creates a new AppState with an empty catalog.
    pub fn new(cache: ResponseCache) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(BTreeMap::new())),
            cache,
        }
    }

    /// Adds items before the server starts.
    pub async fn seed(&self, items: impl IntoIterator<Item = Item>) {
        let mut catalog = self.catalog.write().await;
        for item in items {
            catalog.insert(item.id, item);
        }
    }
}

/// Query parameters for GET /items
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only items priced at or below this value
    pub max_price: Option<u64>,
}

/// Handler for GET /items
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Item>> {
    let catalog = state.catalog.read().await;
    let items = catalog
        .values()
        .filter(|item| query.max_price.map_or(true, |max| item.price <= max))
        .cloned()
        .collect();

    Json(items)
}

/// Handler for GET /items/:id
pub async fn get_item(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Item>> {
    let catalog = state.catalog.read().await;
    let item = catalog
        .get(&id)
        .cloned()
        .ok_or_else(|| CacheError::NotFound(format!("item {}", id)))?;

    Ok(Json(item))
}

/// Handler for PUT /items/:id
///
/// Creates or replaces the item.
pub async fn put_item(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<UpsertItemRequest>,
) -> Result<Json<Item>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let item = Item {
        id,
        name: req.name,
        price: req.price,
        updated_at: Utc::now(),
    };
    state.catalog.write().await.insert(id, item.clone());

    Ok(Json(item))
}

/// Handler for DELETE /items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DeleteResponse>> {
    let mut catalog = state.catalog.write().await;
    catalog
        .remove(&id)
        .ok_or_else(|| CacheError::NotFound(format!("item {}", id)))?;

    Ok(Json(DeleteResponse::new(id)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
