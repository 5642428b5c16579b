//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers;
use super::handlers::AppState;

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Service info
        .route("/", get(handlers::root))
        // Health check
        .route("/health", get(handlers::health))
        // Recommendation stream
        .route("/recommend", post(handlers::recommend))
        .with_state(state)
}
