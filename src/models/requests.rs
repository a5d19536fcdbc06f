//! Request DTOs for the catalog API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for creating or replacing an item (PUT /items/:id)
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertItemRequest {
    /// Display name
    pub name: String,
    /// Price in minor currency units
    pub price: u64,
}

impl UpsertItemRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("Name cannot be empty".to_string());
        }
        if self.name.len() > 256 {
            return Some("Name exceeds maximum length of 256 characters".to_string());
        }
        None
    }
}
