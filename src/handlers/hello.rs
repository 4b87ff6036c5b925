//! Liveness probe endpoint.

use axum::Json;
use serde_json::{Value, json};

/// `GET /hello` — static success response, no authentication, no store
/// access. Exists purely so the deployment has something to probe.
pub async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello, World!" }))
}
