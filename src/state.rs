//! Shared application state handed to handlers and middleware.

use std::sync::Arc;

use chrono::Duration;

use crate::store::{KeyStore, ProviderRegistry};

/// Everything a request handler needs, cloned per request.
///
/// The stores are trait objects so the HTTP layer is identical over the
/// PostgreSQL implementations in production and the in-memory ones in tests.
#[derive(Clone)]
pub struct AppState {
    /// Key Store; the authorizer is its only writer on the request path
    pub keys: Arc<dyn KeyStore>,

    /// Provider Registry; read-only on the request path
    pub providers: Arc<dyn ProviderRegistry>,

    /// Outbound HTTP client, configured with the upstream timeout
    pub http: reqwest::Client,

    /// Fixed quota window length
    pub window: Duration,
}
