//! Session authentication middleware.
//!
//! - [`verify_user`]: verifies the session credential, rejects with 401
//! - [`attach_identity`]: verifies when possible, never rejects
//! - [`check_authentication`]: rejects with 400 when no identity is attached
//!
//! Protected route groups stack `verify_user` outside `check_authentication`.
//! Routes that only personalise use `attach_identity`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jobber_gateway_core::SessionAuthenticator;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Verify the caller's session credential and attach the identity.
pub async fn verify_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state.authenticator.verify(request.extensions_mut())?;
    Ok(next.run(request).await)
}

/// Attach the caller's identity if the session credential verifies.
pub async fn attach_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Err(e) = state.authenticator.verify(request.extensions_mut()) {
        debug!(error = %e, "continuing without identity");
    }
    next.run(request).await
}

/// Reject requests that reach a protected route without an identity.
pub async fn check_authentication(request: Request, next: Next) -> Result<Response, ApiError> {
    SessionAuthenticator::require_authenticated(request.extensions())?;
    Ok(next.run(request).await)
}
