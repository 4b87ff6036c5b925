//! HTTP handler that forwards authorized requests to provider backends.

use axum::{
    Extension,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri, header},
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::models::decision::RouteContext;
use crate::services::router;
use crate::state::AppState;

/// Forward an authorized request to its provider backend.
///
/// Matches `ANY /api/{provider_id}/invoke` and
/// `ANY /api/{provider_id}/invoke/{*rest}`. By the time this runs, the
/// authorization middleware has already consumed quota and resolved the
/// provider; the handler only performs the outbound call and relays the
/// backend response verbatim (status and body), so a backend 404 stays a 404.
///
/// Performs no quota accounting: a forwarded-but-failed call keeps its
/// consumed unit, since authorization already happened.
pub async fn invoke(
    State(state): State<AppState>,
    Extension(context): Extension<RouteContext>,
    uri: Uri,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    // The middleware only allows provider-scoped requests through with a
    // resolved target; a missing one here is a wiring bug, not caller error.
    let Some(target) = context.provider.as_ref() else {
        tracing::error!(tenant_id = %context.tenant_id, "route context has no provider target");
        return Err(GatewayError::BadGateway);
    };

    let path_suffix = raw_suffix(&uri);
    let content_type = headers.get(header::CONTENT_TYPE).cloned();

    tracing::info!(
        tenant_id = %context.tenant_id,
        owner = %context.owner,
        endpoint = %target.endpoint,
        "forwarding request"
    );

    let upstream = router::forward(
        &state.http,
        target,
        method,
        path_suffix,
        uri.query(),
        content_type,
        body,
    )
    .await?;

    Ok(relay(upstream))
}

/// Pull the raw path suffix beyond the `/invoke` segment out of the request
/// URI.
///
/// The `{*rest}` path capture is percent-decoded by the router, so rebuilding
/// the upstream URL from it would corrupt encoded segments (a decoded `#`
/// turns into a fragment, a decoded `%2F` into an extra path separator). The
/// URI path keeps the caller's original encoding, which is what must reach
/// the backend unchanged.
fn raw_suffix(uri: &Uri) -> Option<&str> {
    let rest = uri.path().strip_prefix("/api/")?;
    let (_provider_id, rest) = rest.split_once('/')?;
    rest.strip_prefix("invoke")?.strip_prefix('/')
}

/// Turn an upstream response into the caller-facing response.
fn relay(upstream: router::UpstreamResponse) -> Response {
    let mut response = (upstream.status, upstream.body).into_response();
    if let Some(content_type) = upstream.content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
}
