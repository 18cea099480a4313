//! Request extractors.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jobber_gateway_core::{IdentityPayload, SessionAuthenticator};

use crate::error::ApiError;

/// Identity of the authenticated caller.
///
/// Applies the same gate as the `check_authentication` middleware: the
/// request is rejected with 400 when no identity was attached upstream.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub IdentityPayload);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = SessionAuthenticator::require_authenticated(&parts.extensions)?;
        Ok(CurrentUser(identity.clone()))
    }
}
