//! Signed session cookie store.
//!
//! The session travels as two cookies:
//!
//! - `session`: base64 of the JSON session (`{"jwt": "..."}`)
//! - `session.sig`: base64url HMAC-SHA256 of `session=<value>`
//!
//! The first key signs. Every configured key verifies, so keys can be rotated
//! without logging everyone out.

use std::time::Duration;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use jobber_gateway_core::{GatewayError, Session};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Cookie name of the session.
pub const SESSION_COOKIE: &str = "session";

const DEFAULT_MAX_AGE_SECONDS: u64 = 7 * 24 * 3600;

/// Reads and writes the signed session cookie.
pub struct SessionStore {
    keys: Vec<Vec<u8>>,
    secure: bool,
    domain: Option<String>,
    max_age: Duration,
}

impl SessionStore {
    /// Create a store from signing keys in rotation order.
    pub fn new<I, K>(keys: I) -> Result<Self, GatewayError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<Vec<u8>> = keys
            .into_iter()
            .filter(|key| !key.as_ref().trim().is_empty())
            .map(|key| key.as_ref().as_bytes().to_vec())
            .collect();

        if keys.is_empty() {
            return Err(GatewayError::Configuration(
                "at least one session cookie key is required".to_string(),
            ));
        }

        Ok(Self {
            keys,
            secure: true,
            domain: None,
            max_age: Duration::from_secs(DEFAULT_MAX_AGE_SECONDS),
        })
    }

    /// Mark cookies `Secure`. Only disable for local development.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Scope cookies to a domain.
    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Session carried by the request, if its signature verifies.
    pub fn load(&self, headers: &HeaderMap) -> Option<Session> {
        let cookies = request_cookies(headers);
        let value = find_cookie(&cookies, SESSION_COOKIE)?;
        let Some(signature) = find_cookie(&cookies, &signature_cookie_name()) else {
            debug!("session cookie without signature ignored");
            return None;
        };

        if !self.verify(value, signature) {
            debug!("session cookie signature mismatch");
            return None;
        }

        let json = STANDARD.decode(value).ok()?;
        serde_json::from_slice(&json)
            .map_err(|e| debug!(error = %e, "session cookie is not valid JSON"))
            .ok()
    }

    /// `Set-Cookie` values persisting `session`.
    pub fn persist(&self, session: &Session) -> Result<Vec<HeaderValue>, GatewayError> {
        let json = serde_json::to_vec(session)
            .map_err(|e| GatewayError::Configuration(format!("unserializable session: {}", e)))?;
        let value = STANDARD.encode(json);
        let signature = self.sign(&value)?;
        let max_age = self.max_age.as_secs();

        Ok(vec![
            self.set_cookie(SESSION_COOKIE, &value, max_age)?,
            self.set_cookie(&signature_cookie_name(), &signature, max_age)?,
        ])
    }

    /// `Set-Cookie` values that expire the session immediately.
    pub fn clear(&self) -> Result<Vec<HeaderValue>, GatewayError> {
        Ok(vec![
            self.set_cookie(SESSION_COOKIE, "", 0)?,
            self.set_cookie(&signature_cookie_name(), "", 0)?,
        ])
    }

    fn sign(&self, value: &str) -> Result<String, GatewayError> {
        let key = self.keys.first().ok_or_else(|| {
            GatewayError::Configuration("no session cookie key configured".to_string())
        })?;
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| GatewayError::Configuration(format!("HMAC error: {}", e)))?;
        mac.update(signed_content(value).as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    fn verify(&self, value: &str, signature: &str) -> bool {
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let content = signed_content(value);

        self.keys.iter().any(|key| {
            HmacSha256::new_from_slice(key)
                .map(|mut mac| {
                    mac.update(content.as_bytes());
                    mac.verify_slice(&signature).is_ok()
                })
                .unwrap_or(false)
        })
    }

    fn set_cookie(&self, name: &str, value: &str, max_age: u64) -> Result<HeaderValue, GatewayError> {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            name, value, max_age
        );
        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if self.secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie)
            .map_err(|e| GatewayError::Configuration(format!("invalid session cookie: {}", e)))
    }
}

fn signature_cookie_name() -> String {
    format!("{}.sig", SESSION_COOKIE)
}

fn signed_content(value: &str) -> String {
    format!("{}={}", SESSION_COOKIE, value)
}

fn request_cookies(headers: &HeaderMap) -> Vec<(&str, &str)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| (name.trim(), value.trim()))
        .collect()
}

fn find_cookie<'a>(cookies: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
    cookies
        .iter()
        .find(|(cookie, _)| *cookie == name)
        .map(|(_, value)| *value)
}
