//! Signing secrets tagged with the trust boundary they belong to.
//!
//! A [`SessionSecret`] and a [`ServiceSecret`] are different types, so a
//! user-session secret can never be handed to the service token issuer (or
//! the other way round) by accident.

use std::fmt;
use std::marker::PhantomData;

use jsonwebtoken::{DecodingKey, EncodingKey};
use secrecy::{ExposeSecret, SecretString};

use crate::error::GatewayError;

/// Marker for a signing-key domain.
pub trait TrustBoundary {
    /// Human-readable boundary name used in errors and logs.
    const NAME: &'static str;
}

/// End-user session credentials.
#[derive(Debug)]
pub enum UserSession {}

/// Gateway-to-service identity assertions.
#[derive(Debug)]
pub enum InterService {}

impl TrustBoundary for UserSession {
    const NAME: &'static str = "user-session";
}

impl TrustBoundary for InterService {
    const NAME: &'static str = "inter-service";
}

/// HMAC secret bound to one trust boundary.
pub struct SigningSecret<B: TrustBoundary> {
    secret: SecretString,
    _boundary: PhantomData<fn() -> B>,
}

/// Secret used to verify end-user session credentials.
pub type SessionSecret = SigningSecret<UserSession>;

/// Secret used to sign service identity tokens.
pub type ServiceSecret = SigningSecret<InterService>;

impl<B: TrustBoundary> SigningSecret<B> {
    /// Wrap a raw secret. Empty or whitespace-only secrets are rejected.
    pub fn new(secret: impl Into<String>) -> Result<Self, GatewayError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(GatewayError::Configuration(format!(
                "{} secret must not be empty",
                B::NAME
            )));
        }

        Ok(Self {
            secret: SecretString::from(secret),
            _boundary: PhantomData,
        })
    }

    /// Name of the boundary this secret belongs to.
    pub fn boundary(&self) -> &'static str {
        B::NAME
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    /// True when both secrets hold the same key material.
    pub(crate) fn shares_material_with<O: TrustBoundary>(&self, other: &SigningSecret<O>) -> bool {
        self.secret.expose_secret() == other.secret.expose_secret()
    }
}

impl<B: TrustBoundary> fmt::Debug for SigningSecret<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("boundary", &B::NAME)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
