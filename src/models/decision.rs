//! Authorization decisions and the context threaded to the router.
//!
//! A decision is produced fresh for every request and consumed immediately;
//! nothing here is persisted or cached. Caching a decision would let requests
//! slip past the quota, since the quota snapshot is only consistent at the
//! moment of the decrement.

use std::fmt;

use uuid::Uuid;

use crate::models::provider::ProviderRecord;

/// Outcome of a single authorization attempt.
#[derive(Debug, Clone)]
pub enum AuthDecision {
    /// Request may proceed; the context carries everything the router needs.
    Allow(RouteContext),

    /// Request is rejected for the given reason.
    Deny(DenyReason),
}

impl AuthDecision {
    /// True for `Allow`.
    pub fn is_allow(&self) -> bool {
        matches!(self, AuthDecision::Allow(_))
    }
}

/// Why an authorization attempt was denied.
///
/// Each reason maps to its own error code so callers can log and meter them
/// separately; none is collapsed into a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Authorization header missing, malformed, or not a bearer token
    MissingCredential,

    /// Credential does not match any key record
    UnknownKey,

    /// Key exists but has been revoked
    KeyDisabled,

    /// Quota for the current window is exhausted; expected steady-state
    /// behavior, not a fault
    QuotaExceeded,

    /// Path-supplied provider id matches no registry entry
    UnknownProvider,
}

/// Context produced on `Allow`, consumed by the router.
///
/// Passed explicitly through request extensions; the provider secret lives
/// only inside this value for the duration of the request.
#[derive(Clone)]
pub struct RouteContext {
    /// Tenant identifier (the key record id), for logs and metrics
    pub tenant_id: Uuid,

    /// Key holder name, for logs
    pub owner: String,

    /// Backend target; `None` for decisions that were not provider-scoped
    pub provider: Option<ProviderTarget>,
}

/// Backend endpoint plus the secret to inject when forwarding.
#[derive(Clone)]
pub struct ProviderTarget {
    pub endpoint: String,
    pub secret: String,
}

impl ProviderTarget {
    pub fn from_record(record: &ProviderRecord) -> Self {
        Self {
            endpoint: record.endpoint.clone(),
            secret: record.secret.clone(),
        }
    }
}

// Manual Debug impls keep the provider secret out of log output.

impl fmt::Debug for RouteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteContext")
            .field("tenant_id", &self.tenant_id)
            .field("owner", &self.owner)
            .field("provider", &self.provider)
            .finish()
    }
}

impl fmt::Debug for ProviderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderTarget")
            .field("endpoint", &self.endpoint)
            .field("secret", &"<redacted>")
            .finish()
    }
}
