use axum::middleware;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use super::handlers;
use super::health;
use super::AppState;

/// Request bodies larger than this are rejected before parsing.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create application router
pub fn create_router(state: Arc<AppState>, allowed_origins: Vec<String>) -> axum::Router {
    use crate::middleware::{request_context_middleware, request_id_middleware};

    // Configure CORS with specific origins
    let cors = if allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|s| s.parse::<http::HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // JSON API consumed by the web form
    let api_routes = axum::Router::new()
        .route("/api/shorten", post(handlers::shorten))
        .route("/api/{code}", get(handlers::resolve));

    // Bare short links shared in browsers
    let redirect_routes = axum::Router::new().route("/{code}", get(handlers::redirect));

    // Health check endpoint
    let health_routes = axum::Router::new().route("/_health", get(health::health_check));

    // Merge routers and apply middleware layers
    api_routes
        .merge(redirect_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(request_context_middleware))
        .with_state(state)
}
