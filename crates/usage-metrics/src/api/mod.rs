//! HTTP endpoint serving metrics snapshots

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;

use axum::http::{header, Method};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Router with CORS and request tracing applied
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// HTTP API server
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Serve until Ctrl+C
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = build_app(self.state);

        let listener = TcpListener::bind(addr).await?;

        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(tokio::signal::ctrl_c()))
            .await
            .map_err(Error::Io)?;

        Ok(())
    }
}

/// Resolves once `signal` fires. If the handler cannot be installed, never
/// resolves and the server runs until killed.
async fn shutdown_signal<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Ctrl+C received, shutting down..."),
        Err(e) => {
            warn!(error = %e, "Failed to install Ctrl+C handler, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::collector::MetricsCollector;
    use crate::config::{AnalyticsConfig, FallbackConfig};
    use crate::models::{MetricsSnapshot, ServiceAccountCredentials, SnapshotSource};

    fn app() -> Router {
        let analytics = AnalyticsConfig {
            property_id: "440648046".to_string(),
            ..AnalyticsConfig::default()
        };
        let collector = MetricsCollector::new(&analytics, &FallbackConfig::default()).unwrap();
        build_app(AppState {
            collector: Arc::new(collector),
            credentials: Arc::new(None::<ServiceAccountCredentials>),
            cache_max_age_secs: 3600,
        })
    }

    #[tokio::test]
    async fn shutdown_waits_when_signal_handler_fails() {
        let failed = shutdown_signal(async {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "signal handler unavailable"))
        });
        assert!(tokio::time::timeout(std::time::Duration::from_millis(50), failed)
            .await
            .is_err());

        let received = shutdown_signal(async { Ok(()) });
        assert!(tokio::time::timeout(std::time::Duration::from_millis(50), received)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn metrics_without_credentials_still_answers_200() {
        let response = app()
            .oneshot(Request::builder().uri("/api/v1/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let snapshot: MetricsSnapshot = serde_json::from_slice(&body).unwrap();
        assert!(snapshot.degraded);
        assert_eq!(snapshot.source, SnapshotSource::Fallback);
        assert_eq!(snapshot.get("downloads").unwrap().display_value, "1,200+");
        assert_eq!(snapshot.get("activeUsers").unwrap().display_value, "850+");
    }

    #[tokio::test]
    async fn answers_cors_preflight() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/v1/metrics")
                    .header(header::ORIGIN, "https://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .to_string();
        assert!(methods.contains("GET") && methods.contains("POST") && methods.contains("OPTIONS"));
    }
}
