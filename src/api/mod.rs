//! API Module
//!
//! HTTP handlers and routing for the demonstration catalog service.
//!
//! # Endpoints
//! - `GET /items` - List items (cached)
//! - `GET /items/:id` - Fetch an item (cached)
//! - `PUT /items/:id` - Create or replace an item (invalidates)
//! - `DELETE /items/:id` - Delete an item (invalidates)
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
