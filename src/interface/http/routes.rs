use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::adapters::store::MetricsState;

use super::handlers::{favicon_handler, health_handler, metrics_handler, AppState};

pub fn create_router(metrics: Arc<MetricsState>) -> Router {
    let state = AppState { metrics };

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/favicon.ico", get(favicon_handler))
        .route("/api/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::{Device, DeviceFilter, DeviceStatus};

    async fn get_path(router: Router, uri: &str) -> axum::response::Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = Arc::new(MetricsState::new().unwrap());
        metrics.update_status(&[Device::new("SN1", DeviceStatus::Fault)], &DeviceFilter::default());

        let response = get_path(create_router(metrics), "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("foxess_device_status{inverter=\"SN1\"} 2"));
    }

    #[tokio::test]
    async fn test_favicon_redirects() {
        let metrics = Arc::new(MetricsState::new().unwrap());
        let response = get_path(create_router(metrics), "/favicon.ico").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://www.foxesscloud.com/favicon.ico"
        );
    }

    #[tokio::test]
    async fn test_health() {
        let metrics = Arc::new(MetricsState::new().unwrap());
        let response = get_path(create_router(metrics), "/api/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
