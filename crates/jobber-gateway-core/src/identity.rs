//! Identity carried by an authenticated request.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Decoded claims of a valid session credential.
///
/// Keeps every claim exactly as issued. Attached to the request by
/// [`SessionAuthenticator::verify`] and read-only from then on.
///
/// [`SessionAuthenticator::verify`]: crate::session::SessionAuthenticator::verify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityPayload {
    /// Stable user identifier, a string or a number as issued.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Value,
    /// All other claims.
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl IdentityPayload {
    /// Payload with only the user identifier set.
    pub fn new(id: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            claims: Map::new(),
        }
    }

    /// Add a claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// User identifier as text. Numeric ids are rendered in decimal.
    pub fn user_id(&self) -> String {
        match &self.id {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        }
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn username(&self) -> Option<&str> {
        self.claim("username").and_then(Value::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.claim("email").and_then(Value::as_str)
    }

    /// Expiration time (Unix timestamp).
    pub fn expires_at(&self) -> Option<u64> {
        self.claim("exp").and_then(Value::as_u64)
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        id @ (Value::String(_) | Value::Number(_)) => Ok(id),
        other => Err(D::Error::custom(format!(
            "id claim must be a string or a number, got {}",
            other
        ))),
    }
}

/// Content of the signed session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session credential issued by the login flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

impl Session {
    pub fn with_jwt(jwt: impl Into<String>) -> Self {
        Self {
            jwt: Some(jwt.into()),
        }
    }

    /// Credential if one is present and non-empty.
    pub fn credential(&self) -> Option<&str> {
        self.jwt.as_deref().filter(|jwt| !jwt.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_id_kept_as_issued() {
        let payload: IdentityPayload =
            serde_json::from_str(r#"{"id": 42, "username": "jane", "email": "jane@example.com"}"#)
                .unwrap();

        assert_eq!(payload.id, json!(42));
        assert_eq!(payload.user_id(), "42");
        assert_eq!(payload.username(), Some("jane"));
        assert_eq!(payload.email(), Some("jane@example.com"));
        assert_eq!(serde_json::to_value(&payload).unwrap()["id"], json!(42));
    }

    #[test]
    fn test_extra_claims_survive_serialization() {
        let claims = json!({ "id": "u1", "role": "seller", "country": "VN", "exp": 1_900_000_000u64 });
        let payload: IdentityPayload = serde_json::from_value(claims.clone()).unwrap();

        assert_eq!(payload.claim("role"), Some(&json!("seller")));
        assert_eq!(payload.expires_at(), Some(1_900_000_000));
        assert_eq!(serde_json::to_value(&payload).unwrap(), claims);
    }

    #[test]
    fn test_structured_id_rejected() {
        assert!(serde_json::from_str::<IdentityPayload>(r#"{"id": {"nested": 1}}"#).is_err());
        assert!(serde_json::from_str::<IdentityPayload>(r#"{"id": null}"#).is_err());
    }

    #[test]
    fn test_missing_id_rejected() {
        let result = serde_json::from_str::<IdentityPayload>(r#"{"username": "jane"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_jwt_is_no_credential() {
        assert_eq!(Session::default().credential(), None);
        assert_eq!(Session::with_jwt("").credential(), None);
        assert_eq!(Session::with_jwt("abc").credential(), Some("abc"));
    }
}
