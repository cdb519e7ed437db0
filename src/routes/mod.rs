//! HTTP route handlers.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod message;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Creates the Axum router with the health probe and the greeting route.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(message::message))
        .route("/health", get(health::check_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
