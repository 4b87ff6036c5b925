//! Per-request authorization: credential validation, provider resolution,
//! and the atomic quota consume.
//!
//! Every request gets a fresh decision. Decisions are never cached or reused:
//! quota state is only consistent with the moment of the decrement, and a
//! cached decision would systematically under-enforce quota under load. The
//! latency cost of the per-request store round trip is accepted.
//!
//! # Check ordering
//!
//! The provider lookup runs *before* the quota consume. A request against an
//! unknown provider is a routing mistake rather than credential usage, so it
//! does not consume a unit of quota. Tests assert this ordering.

use chrono::{Duration, Utc};

use crate::error::GatewayError;
use crate::models::decision::{AuthDecision, DenyReason, ProviderTarget, RouteContext};
use crate::services::issuer::hash_key;
use crate::store::{KeyStore, ProviderRegistry, QuotaOutcome};

/// Compute an authorization decision for one request.
///
/// # Arguments
///
/// * `keys` - Key Store (the only component that mutates quota state)
/// * `providers` - Provider Registry, consulted for provider-scoped calls
/// * `header_value` - Raw `Authorization` header value, if present
/// * `provider_id` - Path-supplied provider id; `None` for calls that are
///   not provider-scoped
/// * `window` - Fixed quota window length
///
/// # Flow
///
/// 1. Extract the bearer token from the header value
/// 2. Resolve the provider (provider-scoped calls only)
/// 3. Atomically consume one unit of quota, folding in any window rollover
/// 4. On success, return `Allow` with the context the router needs
///
/// # Errors
///
/// Only store failures surface as `Err`; every policy outcome is an
/// `AuthDecision` so the caller can meter deny reasons individually.
pub async fn authorize(
    keys: &dyn KeyStore,
    providers: &dyn ProviderRegistry,
    header_value: Option<&str>,
    provider_id: Option<&str>,
    window: Duration,
) -> Result<AuthDecision, GatewayError> {
    // Step 1: Extract the bearer token.
    let Some(credential) = extract_bearer(header_value) else {
        return Ok(AuthDecision::Deny(DenyReason::MissingCredential));
    };

    // Step 2: Resolve the provider before touching quota state, so an
    // unknown provider never costs the tenant a unit.
    let target = match provider_id {
        Some(id) => match providers.get(id).await? {
            Some(record) => Some(ProviderTarget::from_record(&record)),
            None => return Ok(AuthDecision::Deny(DenyReason::UnknownProvider)),
        },
        None => None,
    };

    // Step 3: Single atomic conditional consume. The store serializes
    // concurrent consumes per key; there is no read-then-write race here.
    let outcome = keys
        .consume_quota(&hash_key(credential), window, Utc::now())
        .await?;

    let decision = match outcome {
        QuotaOutcome::Consumed {
            tenant_id,
            owner,
            remaining,
        } => {
            tracing::debug!(%tenant_id, remaining, "authorized request");
            AuthDecision::Allow(RouteContext {
                tenant_id,
                owner,
                provider: target,
            })
        }
        QuotaOutcome::Exhausted => AuthDecision::Deny(DenyReason::QuotaExceeded),
        QuotaOutcome::Disabled => AuthDecision::Deny(DenyReason::KeyDisabled),
        QuotaOutcome::NotFound => AuthDecision::Deny(DenyReason::UnknownKey),
    };

    Ok(decision)
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
///
/// Returns `None` for a missing header, a non-bearer scheme, or an empty
/// token, all of which deny with `MissingCredential`.
fn extract_bearer(header_value: Option<&str>) -> Option<&str> {
    let token = header_value?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_bearer(Some("Bearer ")), None);
        assert_eq!(extract_bearer(Some("Basic abc123")), None);
        assert_eq!(extract_bearer(Some("abc123")), None);
        assert_eq!(extract_bearer(None), None);
    }
}
