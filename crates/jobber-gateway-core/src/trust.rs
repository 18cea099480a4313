//! GatewayTrust - both halves of the gateway trust chain, built together.
//!
//! Building them in one place is what enforces that the user-session and
//! inter-service secrets stay distinct.

use crate::error::GatewayError;
use crate::secret::{ServiceSecret, SessionSecret};
use crate::service_token::ServiceTokenIssuer;
use crate::session::{ExpiryPolicy, SessionAuthenticator};

/// Inbound session verification plus outbound token issuance.
///
/// # Example
///
/// ```rust,ignore
/// use jobber_gateway_core::{ExpiryPolicy, GatewayTrust};
///
/// let trust = GatewayTrust::builder()
///     .with_session_secret(std::env::var("JWT_TOKEN")?)
///     .with_service_secret(std::env::var("GATEWAY_JWT_TOKEN")?)
///     .with_expiry_policy(ExpiryPolicy::Required { leeway: 30 })
///     .build()?;
///
/// let users = trust.issuer().create_client("http://users-svc", Some("users"))?;
/// ```
#[derive(Debug)]
pub struct GatewayTrust {
    authenticator: SessionAuthenticator,
    issuer: ServiceTokenIssuer,
}

impl GatewayTrust {
    pub fn builder() -> GatewayTrustBuilder {
        GatewayTrustBuilder::new()
    }

    pub fn authenticator(&self) -> &SessionAuthenticator {
        &self.authenticator
    }

    pub fn issuer(&self) -> &ServiceTokenIssuer {
        &self.issuer
    }

    pub fn into_parts(self) -> (SessionAuthenticator, ServiceTokenIssuer) {
        (self.authenticator, self.issuer)
    }
}

/// Builder for [`GatewayTrust`].
pub struct GatewayTrustBuilder {
    session_secret: Option<String>,
    service_secret: Option<String>,
    expiry: ExpiryPolicy,
}

impl GatewayTrustBuilder {
    fn new() -> Self {
        Self {
            session_secret: None,
            service_secret: None,
            expiry: ExpiryPolicy::default(),
        }
    }

    /// Secret that signs end-user session credentials (required).
    pub fn with_session_secret(mut self, secret: impl Into<String>) -> Self {
        self.session_secret = Some(secret.into());
        self
    }

    /// Secret that signs service identity tokens (required).
    pub fn with_service_secret(mut self, secret: impl Into<String>) -> Self {
        self.service_secret = Some(secret.into());
        self
    }

    pub fn with_expiry_policy(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    /// Build the trust chain.
    ///
    /// Fails when either secret is missing or empty, or when both secrets
    /// hold the same value.
    pub fn build(self) -> Result<GatewayTrust, GatewayError> {
        let session_secret = SessionSecret::new(self.session_secret.ok_or_else(|| {
            GatewayError::Configuration("user-session secret is required".to_string())
        })?)?;
        let service_secret = ServiceSecret::new(self.service_secret.ok_or_else(|| {
            GatewayError::Configuration("inter-service secret is required".to_string())
        })?)?;

        if session_secret.shares_material_with(&service_secret) {
            return Err(GatewayError::Configuration(
                "user-session and inter-service secrets must differ".to_string(),
            ));
        }

        Ok(GatewayTrust {
            authenticator: SessionAuthenticator::new(&session_secret, self.expiry),
            issuer: ServiceTokenIssuer::new(&service_secret),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn trust() -> GatewayTrust {
        GatewayTrust::builder()
            .with_session_secret("session-secret")
            .with_service_secret("service-secret")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_missing_secrets() {
        let result = GatewayTrust::builder()
            .with_service_secret("service-secret")
            .build();
        assert!(matches!(result, Err(GatewayError::Configuration(_))));

        let result = GatewayTrust::builder()
            .with_session_secret("session-secret")
            .build();
        assert!(matches!(result, Err(GatewayError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_shared_secret() {
        let result = GatewayTrust::builder()
            .with_session_secret("same-secret")
            .with_service_secret("same-secret")
            .build();

        assert!(matches!(result, Err(GatewayError::Configuration(_))));
    }

    #[test]
    fn test_builder_keeps_expiry_policy() {
        let trust = GatewayTrust::builder()
            .with_session_secret("session-secret")
            .with_service_secret("service-secret")
            .with_expiry_policy(ExpiryPolicy::Disabled)
            .build()
            .unwrap();

        assert_eq!(trust.authenticator().expiry_policy(), ExpiryPolicy::Disabled);
    }

    #[test]
    fn test_service_token_is_not_a_session_credential() {
        let trust = trust();
        let token = trust.issuer().sign("users").unwrap();

        let result = trust.authenticator().decode(token.as_str());
        assert!(matches!(result, Err(GatewayError::NotAuthorized { .. })));
    }

    #[test]
    fn test_session_credential_is_not_a_service_token() {
        let trust = trust();
        let credential = encode(
            &Header::default(),
            &json!({ "id": "users", "iat": 0 }),
            &EncodingKey::from_secret(b"session-secret"),
        )
        .unwrap();

        assert!(trust.authenticator().decode(&credential).is_ok());
        let result = trust.issuer().verify(&credential, "users");
        assert!(matches!(result, Err(GatewayError::NotAuthorized { .. })));
    }
}
