//! Gateway liveness handler.

use axum::http::StatusCode;

/// GET /gateway-health
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "API Gateway service is healthy and OK.")
}
