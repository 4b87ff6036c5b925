//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can authenticate requests, modify request/response, or
//! short-circuit requests (reject unauthorized).

/// Per-request authorization middleware
pub mod authorizer;
