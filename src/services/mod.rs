//! Business logic, kept out of the HTTP layer.

/// Per-request authorization decisions
pub mod authorizer;
/// API key issuance
pub mod issuer;
/// Outbound forwarding to provider backends
pub mod router;
