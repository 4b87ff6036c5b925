//! Outbound forwarding to provider backends.
//!
//! The router performs the actual backend call using the context the
//! authorizer produced. It mutates no state: quota was finalized before this
//! module runs, so a forwarding failure never corrupts accounting (the unit
//! was consumed at authorization time, by design).

use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode};

use crate::error::GatewayError;
use crate::models::decision::ProviderTarget;

/// Header carrying the provider secret to the backend.
pub const GATEWAY_KEY_HEADER: &str = "X-Gateway-Key";

/// What came back from the backend, ready to be relayed to the caller.
///
/// Non-2xx statuses are carried here too: a backend 404 reaches the caller
/// as a 404 with the backend's body, not as a gateway error.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Forward one request to a provider backend.
///
/// # Process
///
/// 1. Join the backend URL from the endpoint and any path suffix beyond the
///    provider-scoping segment; suffix and query arrive still in the
///    caller's original encoding and pass through unchanged
/// 2. Copy method and body unchanged; forward the caller's content type
/// 3. Inject the provider secret as `X-Gateway-Key` (the caller's own
///    `Authorization` header is never forwarded)
/// 4. Relay the backend response verbatim, whatever its status
///
/// # Errors
///
/// - `GatewayTimeout`: backend exceeded the client's configured timeout.
///   Not retried; a retry could double-apply side effects on the backend.
/// - `BadGateway`: backend unreachable (connection refused, DNS failure) or
///   the endpoint URL is unusable
pub async fn forward(
    client: &reqwest::Client,
    target: &ProviderTarget,
    method: Method,
    path_suffix: Option<&str>,
    query: Option<&str>,
    content_type: Option<HeaderValue>,
    body: Bytes,
) -> Result<UpstreamResponse, GatewayError> {
    let joined = join_url(&target.endpoint, path_suffix);
    let mut url = url::Url::parse(&joined).map_err(|err| {
        tracing::warn!(origin = "upstream", error = %err, endpoint = %target.endpoint, "unusable provider endpoint");
        GatewayError::BadGateway
    })?;
    if query.is_some() {
        url.set_query(query);
    }

    let mut outbound = client
        .request(method, url)
        .header(GATEWAY_KEY_HEADER, target.secret.as_str())
        .body(body);

    if let Some(content_type) = content_type {
        outbound = outbound.header(axum::http::header::CONTENT_TYPE, content_type);
    }

    let response = outbound.send().await.map_err(map_send_error)?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .cloned();
    let body = response.bytes().await.map_err(map_send_error)?;

    if !status.is_success() {
        // Upstream-origin failure; distinguishable from gateway-origin
        // errors in logs.
        tracing::warn!(origin = "upstream", status = %status, url = %joined, "backend returned error status");
    }

    Ok(UpstreamResponse {
        status,
        content_type,
        body,
    })
}

/// Append the caller's extra path segments to the backend endpoint.
fn join_url(endpoint: &str, path_suffix: Option<&str>) -> String {
    match path_suffix {
        Some(suffix) if !suffix.is_empty() => {
            format!(
                "{}/{}",
                endpoint.trim_end_matches('/'),
                suffix.trim_start_matches('/')
            )
        }
        _ => endpoint.to_string(),
    }
}

/// Classify a reqwest failure: timeouts become 504, everything else that
/// kept the response from arriving becomes 502.
fn map_send_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        tracing::warn!(origin = "upstream", error = %err, "backend timed out");
        GatewayError::GatewayTimeout
    } else {
        tracing::warn!(origin = "upstream", error = %err, "backend unreachable");
        GatewayError::BadGateway
    }
}
