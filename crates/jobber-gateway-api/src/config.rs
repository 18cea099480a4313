//! Gateway configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. optional TOML file (`gateway.toml`, or the path in `GATEWAY_CONFIG`)
//! 2. environment variables (`JWT_TOKEN`, `GATEWAY_JWT_TOKEN`, `USERS_BASE_URL`, ...)
//!
//! There are no fallback secrets. A missing secret stops the gateway at startup.

use std::fmt;
use std::time::Duration;

use jobber_gateway_core::{ClientOptions, ExpiryPolicy, GatewayError};
use serde::Deserialize;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "gateway";
const DEVELOPMENT: &str = "development";

/// How session credential expiry is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionExpiryMode {
    #[default]
    IfPresent,
    Required,
    Disabled,
}

/// Gateway settings.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_node_env")]
    pub node_env: String,

    /// User-session secret.
    #[serde(default)]
    pub jwt_token: String,
    /// Inter-service secret.
    #[serde(default)]
    pub gateway_jwt_token: String,
    /// Session cookie signing keys. The first signs, both verify.
    #[serde(default)]
    pub secret_key_one: String,
    #[serde(default)]
    pub secret_key_two: String,

    /// Browser origin allowed by CORS.
    #[serde(default)]
    pub client_url: String,
    #[serde(default)]
    pub cookie_domain: Option<String>,

    #[serde(default)]
    pub auth_base_url: Option<String>,
    #[serde(default)]
    pub users_base_url: Option<String>,
    #[serde(default)]
    pub gig_base_url: Option<String>,
    #[serde(default)]
    pub message_base_url: Option<String>,
    #[serde(default)]
    pub order_base_url: Option<String>,
    #[serde(default)]
    pub review_base_url: Option<String>,

    #[serde(default)]
    pub session_expiry: SessionExpiryMode,
    /// Tolerated clock skew in seconds.
    #[serde(default)]
    pub session_leeway_secs: u64,
    #[serde(default = "default_session_max_age_secs")]
    pub session_max_age_secs: u64,
    #[serde(default = "default_outbound_timeout_secs")]
    pub outbound_timeout_secs: u64,
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_server_port() -> u16 {
    4000
}

fn default_node_env() -> String {
    DEVELOPMENT.to_string()
}

fn default_session_max_age_secs() -> u64 {
    7 * 24 * 3600 // 7 days
}

fn default_outbound_timeout_secs() -> u64 {
    30
}

fn default_body_limit_bytes() -> usize {
    200 * 1024 * 1024
}

impl GatewayConfig {
    /// Load from the config file (if any) and the process environment.
    pub fn load() -> Result<Self, GatewayError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(environment())
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        Self::from_settings(settings)
    }

    /// Deserialize and validate already assembled settings.
    ///
    /// Numeric and enum fields are converted from their string form here.
    pub fn from_settings(settings: config::Config) -> Result<Self, GatewayError> {
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        let required = [
            ("JWT_TOKEN", &self.jwt_token),
            ("GATEWAY_JWT_TOKEN", &self.gateway_jwt_token),
            ("SECRET_KEY_ONE", &self.secret_key_one),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(GatewayError::Configuration(format!("{} is required", name)));
            }
        }

        if self.jwt_token == self.gateway_jwt_token {
            return Err(GatewayError::Configuration(
                "JWT_TOKEN and GATEWAY_JWT_TOKEN must differ".to_string(),
            ));
        }

        let positive = [
            ("SESSION_MAX_AGE_SECS", self.session_max_age_secs),
            ("OUTBOUND_TIMEOUT_SECS", self.outbound_timeout_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(GatewayError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.node_env == DEVELOPMENT
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        match self.session_expiry {
            SessionExpiryMode::IfPresent => ExpiryPolicy::IfPresent {
                leeway: self.session_leeway_secs,
            },
            SessionExpiryMode::Required => ExpiryPolicy::Required {
                leeway: self.session_leeway_secs,
            },
            SessionExpiryMode::Disabled => ExpiryPolicy::Disabled,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.outbound_timeout_secs),
            ..ClientOptions::default()
        }
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    /// Cookie signing keys, rotation order.
    pub fn cookie_keys(&self) -> Vec<String> {
        [&self.secret_key_one, &self.secret_key_two]
            .into_iter()
            .filter(|key| !key.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn cookie_domain(&self) -> Option<&str> {
        self.cookie_domain
            .as_deref()
            .map(str::trim)
            .filter(|domain| !domain.is_empty())
    }

    /// `(service name, base address)` for every configured downstream service.
    pub fn downstream_services(&self) -> Vec<(&'static str, &str)> {
        [
            ("auth", &self.auth_base_url),
            ("users", &self.users_base_url),
            ("gig", &self.gig_base_url),
            ("message", &self.message_base_url),
            ("order", &self.order_base_url),
            ("review", &self.review_base_url),
        ]
        .into_iter()
        .filter_map(|(name, url)| {
            url.as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(|url| (name, url))
        })
        .collect()
    }
}

/// Environment source. Values stay strings so secrets are never reparsed.
fn environment() -> config::Environment {
    config::Environment::default()
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("server_port", &self.server_port)
            .field("node_env", &self.node_env)
            .field("client_url", &self.client_url)
            .field("cookie_domain", &self.cookie_domain)
            .field("downstream_services", &self.downstream_services())
            .field("session_expiry", &self.session_expiry)
            .field("session_leeway_secs", &self.session_leeway_secs)
            .field("session_max_age_secs", &self.session_max_age_secs)
            .field("outbound_timeout_secs", &self.outbound_timeout_secs)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .finish_non_exhaustive()
    }
}
