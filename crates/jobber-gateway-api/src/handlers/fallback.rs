//! Fallback for unknown routes.

use axum::{
    http::{header::HOST, HeaderMap, StatusCode, Uri},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

pub async fn not_found(uri: Uri, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown-host");
    error!("{}{} endpoint does not exist.", host, uri);

    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "The endpoint called does not exist" })),
    )
}
