//! Route table assembly.
//!
//! Split out of `main` so integration tests can run the exact production
//! router over in-memory stores.

use axum::{
    Router, middleware as axum_middleware,
    routing::{any, get, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Build the gateway router.
///
/// # Routes
///
/// - `POST /create-key` — public, self-service key issuance
/// - `GET /hello` — public liveness probe
/// - `ANY /api/{provider_id}/invoke[/{*rest}]` — protected; the authorization
///   middleware runs first and threads the route context to the handler
pub fn app(state: AppState) -> Router {
    // Protected routes: authorization middleware applies to this group only.
    let protected = Router::new()
        .route("/api/{provider_id}/invoke", any(handlers::invoke::invoke))
        .route(
            "/api/{provider_id}/invoke/{*rest}",
            any(handlers::invoke::invoke),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::authorizer::authorize_middleware,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/create-key", post(handlers::keys::create_key))
        .route("/hello", get(handlers::hello::hello))
        .merge(protected)
        // Request tracing for observability
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
