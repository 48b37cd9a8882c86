use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::adapters::store::MetricsState;

pub const FAVICON_URL: &str = "https://www.foxesscloud.com/favicon.ico";

/// Custom error type that implements IntoResponse
#[derive(Debug)]
pub struct AppError(String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0).into_response()
    }
}

impl From<prometheus::Error> for AppError {
    fn from(err: prometheus::Error) -> Self {
        error!("Failed to encode metrics: {}", err);
        AppError(err.to_string())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsState>,
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let (content_type, body) = state.metrics.export()?;
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

/// Handler for GET /favicon.ico
pub async fn favicon_handler() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, FAVICON_URL)])
}

/// Handler for GET /api/health
pub async fn health_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": "foxess-exporter"
        })),
    )
}
