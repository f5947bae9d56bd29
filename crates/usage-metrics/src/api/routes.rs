//! API routes

use axum::{routing::get, Router};

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // Metrics
        .route(
            "/api/v1/metrics",
            get(handlers::get_metrics).post(handlers::get_metrics),
        )
        .route(
            "/metrics",
            get(handlers::get_metrics).post(handlers::get_metrics),
        )

        .with_state(state)
}
