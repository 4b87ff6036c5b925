//! Authorization middleware for protected routes.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the bearer credential from the Authorization header
//! 2. Resolve the path-supplied provider id against the registry
//! 3. Atomically consume one unit of quota for the key
//! 4. Inject the resulting [`RouteContext`] into the request
//! 5. Reject denied requests with the matching 4xx error
//!
//! The context travels to the invoke handler through request extensions — an
//! explicit typed value, not ambient state. The provider secret inside it is
//! never logged (the type redacts it from Debug output).

use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::GatewayError;
use crate::models::decision::AuthDecision;
use crate::services::authorizer;
use crate::state::AppState;

/// Authorization middleware function.
///
/// # Flow
///
/// 1. Read `Authorization: Bearer <key>` and the `provider_id` path param
/// 2. Ask the authorizer for a fresh decision (never cached)
/// 3. `Allow`: attach the context, call the next handler
/// 4. `Deny`: short-circuit with the reason's own status and error code
///
/// # Returns
///
/// - `Ok(Response)` if authorized (calls the next handler)
/// - `Err(GatewayError)` carrying the specific denial otherwise
pub async fn authorize_middleware(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    // Step 1: Raw header value; the authorizer handles scheme parsing.
    let header_value = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let provider_id = params.get("provider_id").map(String::as_str);

    // Step 2: Fresh decision for this request.
    let decision = authorizer::authorize(
        state.keys.as_ref(),
        state.providers.as_ref(),
        header_value,
        provider_id,
        state.window,
    )
    .await?;

    match decision {
        AuthDecision::Allow(context) => {
            // Step 3: Thread the context to the handler explicitly.
            request.extensions_mut().insert(context);
            Ok(next.run(request).await)
        }
        AuthDecision::Deny(reason) => {
            tracing::info!(?reason, provider_id, "request denied");
            Err(reason.into())
        }
    }
}
