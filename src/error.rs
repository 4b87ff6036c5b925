//! Error types and HTTP error response handling.
//!
//! This module defines all gateway errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::decision::DenyReason;
use crate::store::StoreError;

/// Gateway-wide error type.
///
/// # Error Categories
///
/// - **Validation Errors**: malformed input, never retried
/// - **Authorization Denials**: one variant per deny reason so the calling
///   layer can log and meter them separately
/// - **Storage Errors**: transient key-generation conflicts and store failures
/// - **Upstream Errors**: failures reaching the backend, surfaced as 5xx;
///   retry is left to the caller since backend idempotency is unknown here
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Authorization header missing, malformed, or not a bearer token.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("No API key provided")]
    MissingCredential,

    /// Credential does not match any key record.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    UnknownKey,

    /// Key exists but has been revoked.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("API key is disabled")]
    KeyDisabled,

    /// Quota for the current window is exhausted.
    ///
    /// Returns HTTP 429 Too Many Requests. Expected steady-state behavior
    /// under load, not a fault.
    #[error("Quota exceeded")]
    QuotaExceeded,

    /// Path-supplied provider id matches no registry entry.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Provider not found")]
    UnknownProvider,

    /// Key generation kept colliding with existing records.
    ///
    /// Retried internally with bounded attempts before surfacing; returns
    /// HTTP 500 when attempts are exhausted.
    #[error("Could not generate a unique API key")]
    StorageConflict,

    /// Key store or provider registry operation failed.
    ///
    /// Returns HTTP 500 Internal Server Error (hides details from client).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Backend was unreachable (connection refused, DNS failure, etc).
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Upstream provider unreachable")]
    BadGateway,

    /// Backend exceeded the configured response timeout.
    ///
    /// Returns HTTP 504 Gateway Timeout. Not retried here: a retry could
    /// double-apply side effects on a non-idempotent backend call.
    #[error("Upstream provider timed out")]
    GatewayTimeout,
}

impl From<DenyReason> for GatewayError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::MissingCredential => GatewayError::MissingCredential,
            DenyReason::UnknownKey => GatewayError::UnknownKey,
            DenyReason::KeyDisabled => GatewayError::KeyDisabled,
            DenyReason::QuotaExceeded => GatewayError::QuotaExceeded,
            DenyReason::UnknownProvider => GatewayError::UnknownProvider,
        }
    }
}

/// Convert GatewayError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// The `code` field is stable and machine-readable; every denial reason keeps
/// its own code so none is collapsed into a generic failure.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            GatewayError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            GatewayError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                "missing_credential",
                self.to_string(),
            ),
            GatewayError::UnknownKey => {
                (StatusCode::UNAUTHORIZED, "unknown_key", self.to_string())
            }
            GatewayError::KeyDisabled => {
                (StatusCode::FORBIDDEN, "key_disabled", self.to_string())
            }
            GatewayError::QuotaExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "quota_exceeded",
                self.to_string(),
            ),
            GatewayError::UnknownProvider => {
                (StatusCode::NOT_FOUND, "unknown_provider", self.to_string())
            }
            GatewayError::StorageConflict => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "key_generation_failed",
                self.to_string(),
            ),
            GatewayError::Store(ref err) => {
                tracing::error!(error = %err, "store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            GatewayError::BadGateway => {
                (StatusCode::BAD_GATEWAY, "bad_gateway", self.to_string())
            }
            GatewayError::GatewayTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "gateway_timeout",
                self.to_string(),
            ),
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
