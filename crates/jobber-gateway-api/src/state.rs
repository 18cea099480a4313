//! Shared application state.
//!
//! Everything here is built once at startup and only read afterwards.

use std::sync::Arc;

use jobber_gateway_core::{
    GatewayError, GatewayTrust, OutboundClient, ServiceClients, SessionAuthenticator,
};
use tracing::info;

use crate::config::GatewayConfig;
use crate::session_store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<SessionAuthenticator>,
    pub sessions: Arc<SessionStore>,
    pub clients: Arc<ServiceClients>,
}

impl AppState {
    pub fn new(
        authenticator: SessionAuthenticator,
        sessions: SessionStore,
        clients: ServiceClients,
    ) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            sessions: Arc::new(sessions),
            clients: Arc::new(clients),
        }
    }

    /// Build the trust chain, session store and outbound clients.
    ///
    /// Any failure here must stop the process before it serves traffic.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let trust = GatewayTrust::builder()
            .with_session_secret(config.jwt_token.as_str())
            .with_service_secret(config.gateway_jwt_token.as_str())
            .with_expiry_policy(config.expiry_policy())
            .build()?;

        let clients = ServiceClients::build(
            trust.issuer(),
            config.downstream_services(),
            &config.client_options(),
        )?;
        info!(services = ?clients.services(), "downstream clients built");

        let sessions = SessionStore::new(config.cookie_keys())?
            .with_secure(!config.is_development())
            .with_domain(config.cookie_domain().map(str::to_string))
            .with_max_age(config.session_max_age());

        let (authenticator, _issuer) = trust.into_parts();
        Ok(Self::new(authenticator, sessions, clients))
    }

    /// Client for a downstream service.
    pub fn client(&self, service: &str) -> Result<&OutboundClient, GatewayError> {
        self.clients.get(service).ok_or_else(|| {
            GatewayError::Outbound(format!("no client configured for service '{}'", service))
        })
    }
}
