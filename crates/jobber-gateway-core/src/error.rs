//! Gateway error types for the Jobber gateway trust core.

use http::StatusCode;
use serde::Serialize;

/// Errors raised by the gateway trust chain.
///
/// Authentication failures carry the message shown to the client and an
/// origin tag naming the check that produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Missing or invalid session credential.
    #[error("{message}")]
    NotAuthorized { message: String, coming_from: String },

    /// A protected route was reached without an attached identity.
    #[error("{message}")]
    BadRequest { message: String, coming_from: String },

    /// Service identity token could not be signed.
    #[error("Service token signing failed: {0}")]
    Signing(String),

    /// Invalid or incomplete configuration.
    #[error("Invalid gateway configuration: {0}")]
    Configuration(String),

    /// Outbound HTTP client failure.
    #[error("Outbound client error: {0}")]
    Outbound(String),
}

impl GatewayError {
    pub fn not_authorized(message: impl Into<String>, coming_from: impl Into<String>) -> Self {
        Self::NotAuthorized {
            message: message.into(),
            coming_from: coming_from.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, coming_from: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            coming_from: coming_from.into(),
        }
    }

    /// HTTP status the boundary translator should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Outbound(_) => StatusCode::BAD_GATEWAY,
            Self::Signing(_) | Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Origin tag of the check that produced this error.
    pub fn coming_from(&self) -> &str {
        match self {
            Self::NotAuthorized { coming_from, .. } | Self::BadRequest { coming_from, .. } => {
                coming_from
            }
            Self::Signing(_) => "GatewayService ServiceTokenIssuer sign()",
            Self::Configuration(_) => "GatewayService configuration",
            Self::Outbound(_) => "GatewayService OutboundClient",
        }
    }

    /// Serializable body for the structured JSON error response.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            message: self.to_string(),
            status_code: self.status_code().as_u16(),
            status: "error".to_string(),
            coming_from: self.coming_from().to_string(),
        }
    }
}

/// Wire shape of an error response: `{ message, statusCode, status, comingFrom }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub status_code: u16,
    pub status: String,
    pub coming_from: String,
}
