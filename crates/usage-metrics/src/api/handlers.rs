//! API handlers for the HTTP endpoint

use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;

use crate::collector::{CredentialSource, MetricsCollector};
use crate::models::SnapshotSource;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Runs one invocation per request
    pub collector: Arc<MetricsCollector>,
    /// Read on every request; credentials are never cached
    pub credentials: Arc<dyn CredentialSource>,
    /// `max-age` of live responses, in seconds
    pub cache_max_age_secs: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: String,
    /// Crate version
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Metrics endpoint.
///
/// Always answers 200 with a snapshot. Live snapshots may be cached by the
/// client; fallback snapshots may not.
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.collector.collect(state.credentials.as_ref()).await;

    let cache_control = match snapshot.source {
        SnapshotSource::Live => format!("public, max-age={}", state.cache_max_age_secs),
        SnapshotSource::Fallback => "no-store".to_string(),
    };

    ([(header::CACHE_CONTROL, cache_control)], Json(snapshot))
}
