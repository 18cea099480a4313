//! Session credential verification and the authenticated-route gate.
//!
//! Verification and gating are two separate steps:
//!
//! - [`SessionAuthenticator::verify`] decodes the credential held in the
//!   request's [`Session`] and attaches an [`IdentityPayload`] to the request.
//! - [`SessionAuthenticator::require_authenticated`] only checks that a payload
//!   is attached. It never decodes anything.

use std::fmt;

use http::Extensions;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GatewayError;
use crate::identity::{IdentityPayload, Session};
use crate::secret::SessionSecret;

const VERIFY_ORIGIN: &str = "GatewayService SessionAuthenticator verify()";
const REQUIRE_ORIGIN: &str = "GatewayService SessionAuthenticator require_authenticated()";

/// How the `exp` claim of a session credential is treated.
///
/// `leeway` is the tolerated clock skew in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ExpiryPolicy {
    /// Enforce `exp` when present, accept credentials without it.
    IfPresent { leeway: u64 },
    /// Reject credentials without `exp`.
    Required { leeway: u64 },
    /// Ignore `exp` entirely.
    Disabled,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::IfPresent { leeway: 0 }
    }
}

impl ExpiryPolicy {
    fn validation(self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        match self {
            Self::IfPresent { leeway } => {
                validation.set_required_spec_claims::<&str>(&[]);
                validation.validate_exp = true;
                validation.leeway = leeway;
            }
            Self::Required { leeway } => {
                validation.set_required_spec_claims(&["exp"]);
                validation.validate_exp = true;
                validation.leeway = leeway;
            }
            Self::Disabled => {
                validation.set_required_spec_claims::<&str>(&[]);
                validation.validate_exp = false;
            }
        }

        validation
    }
}

/// Verifies end-user session credentials signed with the user-session secret.
pub struct SessionAuthenticator {
    key: DecodingKey,
    validation: Validation,
    expiry: ExpiryPolicy,
}

impl SessionAuthenticator {
    pub fn new(secret: &SessionSecret, expiry: ExpiryPolicy) -> Self {
        Self {
            key: secret.decoding_key(),
            validation: expiry.validation(),
            expiry,
        }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// Decode and verify a single credential.
    ///
    /// Any failure (bad signature, wrong algorithm, malformed token, expired,
    /// missing `id`) is reported as [`GatewayError::NotAuthorized`].
    pub fn decode(&self, credential: &str) -> Result<IdentityPayload, GatewayError> {
        let data = jsonwebtoken::decode::<IdentityPayload>(credential, &self.key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "session credential rejected");
                invalid_token()
            })?;

        if data.claims.user_id().trim().is_empty() {
            debug!("session credential has an empty id claim");
            return Err(invalid_token());
        }

        Ok(data.claims)
    }

    /// Verify the request's session credential and attach the identity.
    ///
    /// Returns the already attached payload when called again for the same
    /// request.
    pub fn verify(&self, extensions: &mut Extensions) -> Result<IdentityPayload, GatewayError> {
        if let Some(identity) = extensions.get::<IdentityPayload>() {
            return Ok(identity.clone());
        }

        let credential = extensions
            .get::<Session>()
            .and_then(Session::credential)
            .ok_or_else(|| {
                GatewayError::not_authorized(
                    "Token is not available. Please login again.",
                    VERIFY_ORIGIN,
                )
            })?;

        let identity = self.decode(credential)?;
        extensions.insert(identity.clone());

        Ok(identity)
    }

    /// Gate for routes that need an authenticated caller.
    pub fn require_authenticated(extensions: &Extensions) -> Result<&IdentityPayload, GatewayError> {
        extensions.get::<IdentityPayload>().ok_or_else(|| {
            GatewayError::bad_request("Token is required for this route.", REQUIRE_ORIGIN)
        })
    }
}

impl fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

fn invalid_token() -> GatewayError {
    GatewayError::not_authorized("Invalid token. Please login again.", VERIFY_ORIGIN)
}
