//! Outbound HTTP clients that carry the gateway's service identity.
//!
//! One [`OutboundClient`] exists per downstream service. It is built at
//! startup with its [`ServiceIdentityToken`] baked into the default headers
//! and is never mutated afterwards, so it can be shared across requests
//! without locking.
//!
//! Requests are plain `reqwest` futures: dropping one cancels the call and
//! releases its connection. Failed calls are not retried here.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, HeaderValue, Method};
use reqwest::{RequestBuilder, Url};
use tracing::info;

use crate::error::GatewayError;
use crate::service_token::{ServiceIdentityToken, ServiceTokenIssuer, GATEWAY_TOKEN_HEADER};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Transport options shared by outbound clients.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Relay the caller's session headers downstream.
    pub forward_credentials: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            forward_credentials: true,
        }
    }
}

/// HTTP client bound to one downstream base address.
#[derive(Clone)]
pub struct OutboundClient {
    http: reqwest::Client,
    base_url: String,
    service: Option<String>,
    forward_credentials: bool,
}

impl OutboundClient {
    /// Build a client. Without a token the client makes anonymous calls.
    pub fn new(
        base_address: &str,
        token: Option<&ServiceIdentityToken>,
        options: &ClientOptions,
    ) -> Result<Self, GatewayError> {
        let base_url = parse_base_address(base_address)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            headers.insert(GATEWAY_TOKEN_HEADER, token.header_value()?);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(|e| GatewayError::Outbound(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            service: token.map(|t| t.service().to_string()),
            forward_credentials: options.forward_credentials,
        })
    }

    /// Service name the client identifies as, `None` for anonymous clients.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path`, joined with exactly one `/`.
    pub fn endpoint(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, path)
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.endpoint(path))
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Relay the caller's `Cookie` and `Authorization` headers.
    ///
    /// No-op when credential forwarding is turned off for this client.
    pub fn forward_credentials(&self, builder: RequestBuilder, inbound: &HeaderMap) -> RequestBuilder {
        if !self.forward_credentials {
            return builder;
        }

        let mut forwarded = HeaderMap::new();
        for name in [COOKIE, AUTHORIZATION] {
            if let Some(value) = inbound.get(&name) {
                forwarded.insert(name, value.clone());
            }
        }

        builder.headers(forwarded)
    }
}

impl fmt::Debug for OutboundClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundClient")
            .field("base_url", &self.base_url)
            .field("service", &self.service)
            .field("forward_credentials", &self.forward_credentials)
            .finish_non_exhaustive()
    }
}

fn parse_base_address(base_address: &str) -> Result<String, GatewayError> {
    let url = Url::parse(base_address).map_err(|e| {
        GatewayError::Configuration(format!("invalid base address '{}': {}", base_address, e))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::Configuration(format!(
            "base address '{}' must use http or https",
            base_address
        )));
    }

    Ok(base_address.trim_end_matches('/').to_string())
}

impl ServiceTokenIssuer {
    /// Build a client for `service_name` with default transport options.
    ///
    /// Passing `None` creates an anonymous client without a `gatewayToken`.
    pub fn create_client(
        &self,
        base_address: &str,
        service_name: Option<&str>,
    ) -> Result<OutboundClient, GatewayError> {
        self.create_client_with(base_address, service_name, &ClientOptions::default())
    }

    pub fn create_client_with(
        &self,
        base_address: &str,
        service_name: Option<&str>,
        options: &ClientOptions,
    ) -> Result<OutboundClient, GatewayError> {
        let token = service_name.map(|name| self.sign(name)).transpose()?;
        OutboundClient::new(base_address, token.as_ref(), options)
    }
}

/// Read-only set of outbound clients keyed by service name.
#[derive(Debug, Clone, Default)]
pub struct ServiceClients {
    clients: HashMap<String, OutboundClient>,
}

impl ServiceClients {
    /// Build one client per `(service name, base address)` pair.
    ///
    /// Any signing or configuration failure aborts the whole set.
    pub fn build<I, N, U>(
        issuer: &ServiceTokenIssuer,
        endpoints: I,
        options: &ClientOptions,
    ) -> Result<Self, GatewayError>
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: AsRef<str>,
    {
        let mut clients = HashMap::new();

        for (name, base_address) in endpoints {
            let name = name.into();
            let client = issuer.create_client_with(base_address.as_ref(), Some(&name), options)?;
            info!(service = %name, base_url = %client.base_url(), "outbound client ready");
            clients.insert(name, client);
        }

        Ok(Self { clients })
    }

    pub fn get(&self, service: &str) -> Option<&OutboundClient> {
        self.clients.get(service)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Configured service names, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
