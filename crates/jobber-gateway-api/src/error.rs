//! Boundary error translator.
//!
//! Every typed gateway error ends up here and leaves as the structured JSON
//! body `{ message, statusCode, status, comingFrom }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jobber_gateway_core::GatewayError;
use tracing::{error, warn, Level};

/// HTTP-facing wrapper around [`GatewayError`].
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub GatewayError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = self.0.to_response();

        if severity(status) == Level::ERROR {
            error!(coming_from = %body.coming_from, "GatewayService {}: {}", body.coming_from, self.0);
        } else {
            warn!(coming_from = %body.coming_from, "GatewayService {}: {}", body.coming_from, self.0);
        }

        (status, Json(body)).into_response()
    }
}

/// Log level for a rejected request: `error` for gateway faults, `warn` for
/// caller faults such as failed authentication.
fn severity(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else {
        Level::WARN
    }
}
