//! HTTP handler for self-service key issuance.

use axum::{Json, extract::State};

use crate::error::GatewayError;
use crate::models::key_record::{IssueKeyRequest, IssueKeyResponse};
use crate::services::issuer;
use crate::state::AppState;

/// Issue a new API key.
///
/// `POST /create-key` — intentionally unauthenticated (self-service);
/// abuse prevention is the upstream admission control's concern.
///
/// # Request Body
///
/// ```json
/// {
///   "owner": "alice",
///   "quota_limit": 100
/// }
/// ```
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "api_key": "4f3c...64 hex chars...",
///   "owner": "alice",
///   "quota_limit": 100
/// }
/// ```
///
/// The `api_key` is only returned once; the gateway stores a hash.
///
/// # Errors
///
/// Returns 400 for an empty owner or non-positive quota.
pub async fn create_key(
    State(state): State<AppState>,
    Json(request): Json<IssueKeyRequest>,
) -> Result<Json<IssueKeyResponse>, GatewayError> {
    let issued = issuer::issue(state.keys.as_ref(), &request.owner, request.quota_limit).await?;

    Ok(Json(IssueKeyResponse {
        api_key: issued.api_key,
        owner: issued.owner,
        quota_limit: issued.quota_limit,
    }))
}
