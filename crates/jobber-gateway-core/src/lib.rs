//! # Jobber Gateway Core
//!
//! The trust boundary of the Jobber API gateway.
//!
//! ## Overview
//!
//! Two independent mechanisms, composed by the request pipeline:
//!
//! - **Inbound**: [`SessionAuthenticator`] verifies the end-user session
//!   credential and attaches an [`IdentityPayload`] to the request. A separate
//!   gate rejects protected routes reached without one.
//! - **Outbound**: [`ServiceTokenIssuer`] signs a [`ServiceIdentityToken`] per
//!   downstream service and bakes it into an [`OutboundClient`], so every call
//!   proves it came from the gateway.
//!
//! Each side signs with its own secret ([`SessionSecret`] vs
//! [`ServiceSecret`]); a credential from one boundary never validates in the
//! other.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jobber_gateway_core::{ClientOptions, GatewayTrust, ServiceClients};
//!
//! let trust = GatewayTrust::builder()
//!     .with_session_secret("user-session-secret")
//!     .with_service_secret("inter-service-secret")
//!     .build()?;
//!
//! let clients = ServiceClients::build(
//!     trust.issuer(),
//!     [("users", "http://users-svc:4003"), ("gig", "http://gig-svc:4004")],
//!     &ClientOptions::default(),
//! )?;
//!
//! // Inside a handler, after the session middleware ran:
//! let identity = trust.authenticator().verify(request.extensions_mut())?;
//! if let Some(users) = clients.get("users") {
//!     let buyer = users
//!         .get(&format!("/api/v1/buyer/{}", identity.user_id()))
//!         .send()
//!         .await?;
//! }
//! ```

pub mod client;
pub mod error;
pub mod identity;
pub mod secret;
pub mod service_token;
pub mod session;
pub mod trust;

// Primary exports
pub use client::{ClientOptions, OutboundClient, ServiceClients};
pub use error::{ErrorResponse, GatewayError};
pub use identity::{IdentityPayload, Session};
pub use secret::{ServiceSecret, SessionSecret, SigningSecret};
pub use service_token::{
    ServiceClaims, ServiceIdentityToken, ServiceTokenIssuer, GATEWAY_TOKEN_HEADER,
};
pub use session::{ExpiryPolicy, SessionAuthenticator};
pub use trust::{GatewayTrust, GatewayTrustBuilder};
