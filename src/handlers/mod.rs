//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic via the services layer
//! 3. Returns HTTP response (JSON, status code)

/// Liveness probe
pub mod hello;
/// Request forwarding to provider backends
pub mod invoke;
/// Key issuance endpoint
pub mod keys;
