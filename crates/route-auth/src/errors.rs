//! Authentication error types.
//!
//! Every variant is terminal for the request that produced it. Messages
//! returned to clients are intentionally generic; the detailed cause is
//! logged server-side by the `IntoResponse` impl.

use crate::key_source::KeySourceError;
use crate::verifier::VerificationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Authentication and authorization failures.
///
/// Maps to HTTP status codes:
/// - InsufficientScope: 403 Forbidden
/// - NoKeyConfigured, InvalidKeyFormat: 503 Service Unavailable
/// - everything else: 401 Unauthorized
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token format")]
    MalformedHeader,

    #[error("Invalid token type: {0}")]
    UnsupportedScheme(String),

    #[error("Failed to fetch signing key: {0}")]
    KeySourceFailure(#[source] KeySourceError),

    #[error("Signing key must be PEM encoded")]
    InvalidKeyFormat,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] VerificationError),

    #[error("Token does not carry a usable scope claim")]
    MissingScopeClaim,

    #[error("Token does not have '{}' scope", .required.join("', '"))]
    InsufficientScope { required: Vec<String> },

    #[error("No signing key configured")]
    NoKeyConfigured,
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InsufficientScope { .. } => 403,
            AuthError::NoKeyConfigured | AuthError::InvalidKeyFormat => 503,
            AuthError::MalformedHeader
            | AuthError::UnsupportedScheme(_)
            | AuthError::KeySourceFailure(_)
            | AuthError::InvalidToken(_)
            | AuthError::MissingScopeClaim => 401,
        }
    }

    /// Whether the failure may clear up on its own (identity provider outage).
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::KeySourceFailure(_))
    }

    /// Bounded label for metrics.
    pub fn kind_label(&self) -> &'static str {
        match self {
            AuthError::MalformedHeader => "malformed_header",
            AuthError::UnsupportedScheme(_) => "unsupported_scheme",
            AuthError::KeySourceFailure(_) => "key_source_failure",
            AuthError::InvalidKeyFormat => "invalid_key_format",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::MissingScopeClaim => "missing_scope_claim",
            AuthError::InsufficientScope { .. } => "insufficient_scope",
            AuthError::NoKeyConfigured => "no_key_configured",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::MalformedHeader | AuthError::UnsupportedScheme(_) => {
                tracing::debug!(target: "route_auth.errors", error = %self, "Rejected authorization header");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "Invalid authorization header".to_string(),
                )
            }
            AuthError::InvalidToken(_) | AuthError::MissingScopeClaim => {
                tracing::debug!(target: "route_auth.errors", error = %self, "Rejected access token");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "The access token is invalid or expired".to_string(),
                )
            }
            AuthError::KeySourceFailure(err) => {
                // Log actual error server-side, return generic message to client
                tracing::warn!(target: "route_auth.errors", error = %err, "Signing key unavailable");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "The access token could not be verified".to_string(),
                )
            }
            AuthError::InsufficientScope { .. } => (
                StatusCode::FORBIDDEN,
                "INSUFFICIENT_SCOPE",
                self.to_string(),
            ),
            AuthError::InvalidKeyFormat | AuthError::NoKeyConfigured => {
                tracing::error!(target: "route_auth.errors", error = %self, "Signing key misconfigured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        let challenge = match status {
            StatusCode::UNAUTHORIZED => Some("Bearer realm=\"routing-api\", error=\"invalid_token\""),
            StatusCode::FORBIDDEN => {
                Some("Bearer realm=\"routing-api\", error=\"insufficient_scope\"")
            }
            _ => None,
        };
        if let Some(challenge) = challenge {
            if let Ok(header_value) = challenge.parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
