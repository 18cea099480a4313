//! Service identity tokens: the gateway's proof of origin on downstream calls.
//!
//! Tokens are HS256 JWTs of the form `{ id: <service name>, iat }`, signed
//! with the inter-service secret. They are minted once per outbound client,
//! not per call.

use std::fmt;

use chrono::Utc;
use http::{HeaderName, HeaderValue};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GatewayError;
use crate::secret::ServiceSecret;

/// Header carrying the service identity token on every outbound request.
pub const GATEWAY_TOKEN_HEADER: HeaderName = HeaderName::from_static("gatewaytoken");

const VERIFY_ORIGIN: &str = "GatewayService ServiceTokenIssuer verify()";

/// Claims of a service identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClaims {
    /// Logical name of the downstream service the token was minted for.
    pub id: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
}

/// A signed service identity assertion.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceIdentityToken {
    service: String,
    token: String,
}

impl ServiceIdentityToken {
    /// Service this token identifies the gateway to.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Compact JWT form, as sent in the header.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub(crate) fn header_value(&self) -> Result<HeaderValue, GatewayError> {
        let mut value = HeaderValue::from_str(&self.token)
            .map_err(|e| GatewayError::Signing(format!("token is not a valid header value: {}", e)))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for ServiceIdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceIdentityToken")
            .field("service", &self.service)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Signs (and, for downstream use, verifies) service identity tokens.
pub struct ServiceTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl ServiceTokenIssuer {
    pub fn new(secret: &ServiceSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims::<&str>(&[]);
        validation.validate_exp = false;
        validation.validate_aud = false;

        Self {
            encoding: secret.encoding_key(),
            decoding: secret.decoding_key(),
            validation,
        }
    }

    /// Mint a token naming the gateway as caller of `service_name`.
    pub fn sign(&self, service_name: &str) -> Result<ServiceIdentityToken, GatewayError> {
        if service_name.trim().is_empty() {
            return Err(GatewayError::Signing(
                "service name must not be empty".to_string(),
            ));
        }

        let claims = ServiceClaims {
            id: service_name.to_string(),
            iat: Utc::now().timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| GatewayError::Signing(e.to_string()))?;

        Ok(ServiceIdentityToken {
            service: claims.id,
            token,
        })
    }

    /// Check a token the way a downstream service does.
    ///
    /// Fails with [`GatewayError::NotAuthorized`] when the signature does not
    /// verify or the token was minted for a different service.
    pub fn verify(&self, token: &str, expected_service: &str) -> Result<ServiceClaims, GatewayError> {
        let data = jsonwebtoken::decode::<ServiceClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "service identity token rejected");
                GatewayError::not_authorized("Invalid gateway token.", VERIFY_ORIGIN)
            })?;

        if data.claims.id != expected_service {
            debug!(
                expected = expected_service,
                actual = %data.claims.id,
                "service identity token issued for another service"
            );
            return Err(GatewayError::not_authorized(
                "Gateway token was issued for another service.",
                VERIFY_ORIGIN,
            ));
        }

        Ok(data.claims)
    }
}

impl fmt::Debug for ServiceTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTokenIssuer").finish_non_exhaustive()
    }
}
