//! Provider records: the backends the gateway forwards to.

use chrono::{DateTime, Utc};

/// A provider entry from the registry.
///
/// # Database Table
///
/// Maps to the `providers` table with columns:
/// - `provider_id`: Unique path-supplied identifier
/// - `endpoint`: Backend base URL requests are forwarded to
/// - `secret`: Credential injected into forwarded requests
///
/// The request path only ever reads these rows; writes happen through the
/// administrative seed path (`ProviderRegistry::upsert`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProviderRecord {
    /// Path-supplied identifier, e.g. `/api/{provider_id}/invoke`
    pub provider_id: String,

    /// Backend base URL
    pub endpoint: String,

    /// Credential the backend expects in the `X-Gateway-Key` header
    ///
    /// Never echoed to the original caller and never logged.
    pub secret: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
