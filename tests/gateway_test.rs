//! End-to-end tests: the full router over in-memory stores, with real
//! localhost backends for the forwarding paths.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, Uri},
    routing::any,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tenant_gateway::routes;
use tenant_gateway::state::AppState;
use tenant_gateway::store::{MemoryKeyStore, MemoryProviderRegistry, ProviderRegistry};
use tower::ServiceExt;

const SECRET: &str = "backend-secret-token";

/// Build the production router over fresh in-memory stores.
fn test_app(timeout_secs: u64) -> (Router, Arc<MemoryKeyStore>, Arc<MemoryProviderRegistry>) {
    let keys = Arc::new(MemoryKeyStore::new());
    let providers = Arc::new(MemoryProviderRegistry::new());

    let state = AppState {
        keys: keys.clone(),
        providers: providers.clone(),
        http: reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap(),
        window: chrono::Duration::seconds(3600),
    };

    (routes::app(state), keys, providers)
}

/// One request captured by a test backend.
#[derive(Debug, Clone)]
struct Captured {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

/// Start a capturing echo backend on an ephemeral port.
async fn spawn_backend() -> (SocketAddr, Arc<Mutex<Option<Captured>>>) {
    let captured: Arc<Mutex<Option<Captured>>> = Arc::new(Mutex::new(None));
    let sink = captured.clone();

    let handler = move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
        let sink = sink.clone();
        async move {
            *sink.lock().unwrap() = Some(Captured {
                method,
                uri,
                headers,
                body,
            });
            axum::Json(json!({ "message": "ok" }))
        }
    };

    let backend = Router::new()
        .route("/svc", any(handler.clone()))
        .route("/svc/{*rest}", any(handler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, backend).await.unwrap();
    });

    (addr, captured)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Create a key through the public endpoint; returns the plaintext key.
async fn issue_key(app: &Router, owner: &str, quota_limit: i64) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/create-key")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "owner": owner, "quota_limit": quota_limit }).to_string(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["api_key"].as_str().unwrap().to_string()
}

fn invoke_request(provider_id: &str, suffix: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/api/{provider_id}/invoke{suffix}"))
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("authorization", format!("Bearer {key}"));
    }
    builder
        .body(Body::from(json!({ "payload": 42 }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn hello_is_public() {
    let (app, _, _) = test_app(5);

    let response = app
        .oneshot(Request::builder().uri("/hello").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Hello, World!");
}

#[tokio::test]
async fn create_key_returns_plaintext_key() {
    let (app, _, _) = test_app(5);

    let key = issue_key(&app, "alice", 100).await;
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn create_key_rejects_bad_input() {
    let (app, _, _) = test_app(5);

    for body in [
        json!({ "owner": "", "quota_limit": 10 }),
        json!({ "owner": "alice", "quota_limit": 0 }),
        json!({ "owner": "alice", "quota_limit": -3 }),
    ] {
        let request = Request::builder()
            .method("POST")
            .uri("/create-key")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "invalid_request");
    }
}

#[tokio::test]
async fn invoke_forwards_with_secret_injection() {
    let (app, _, providers) = test_app(5);
    let (addr, captured) = spawn_backend().await;
    providers
        .upsert("svc-1", &format!("http://{addr}/svc"), SECRET)
        .await
        .unwrap();

    let key = issue_key(&app, "alice", 10).await;
    let response = app
        .clone()
        .oneshot(invoke_request("svc-1", "", Some(&key)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap()["message"],
        "ok"
    );
    // The provider secret never reaches the original caller.
    assert!(!body.contains(SECRET));

    let seen = captured.lock().unwrap().clone().expect("backend was hit");
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.headers["x-gateway-key"], SECRET);
    // The caller's own credential is not leaked to the backend.
    assert!(!seen.headers.contains_key("authorization"));
    assert_eq!(
        serde_json::from_slice::<Value>(&seen.body).unwrap()["payload"],
        42
    );
}

#[tokio::test]
async fn invoke_preserves_path_suffix() {
    let (app, _, providers) = test_app(5);
    let (addr, captured) = spawn_backend().await;
    providers
        .upsert("svc-1", &format!("http://{addr}/svc"), SECRET)
        .await
        .unwrap();

    let key = issue_key(&app, "alice", 10).await;
    let response = app
        .clone()
        .oneshot(invoke_request("svc-1", "/extra/path", Some(&key)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = captured.lock().unwrap().clone().expect("backend was hit");
    assert_eq!(seen.uri.path(), "/svc/extra/path");
}

#[tokio::test]
async fn encoded_suffix_and_query_are_forwarded_unchanged() {
    let (app, _, providers) = test_app(5);
    let (addr, captured) = spawn_backend().await;
    providers
        .upsert("svc-1", &format!("http://{addr}/svc"), SECRET)
        .await
        .unwrap();

    let key = issue_key(&app, "alice", 10).await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/svc-1/invoke/a%23b%2Fc?x=1&y=%20z")
        .header("authorization", format!("Bearer {key}"))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "payload": 42 }).to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The caller's encoding reaches the backend byte for byte: a decoded `#`
    // would truncate the path into a fragment, a decoded `%2F` would grow an
    // extra path separator.
    let seen = captured.lock().unwrap().clone().expect("backend was hit");
    assert_eq!(seen.uri.path(), "/svc/a%23b%2Fc");
    assert_eq!(seen.uri.query(), Some("x=1&y=%20z"));
}

#[tokio::test]
async fn backend_error_status_is_forwarded_verbatim() {
    let (app, _, providers) = test_app(5);

    let backend = Router::new().route(
        "/svc",
        any(|| async { (StatusCode::NOT_FOUND, "no such thing") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, backend).await.unwrap();
    });

    providers
        .upsert("svc-1", &format!("http://{addr}/svc"), SECRET)
        .await
        .unwrap();

    let key = issue_key(&app, "alice", 10).await;
    let response = app
        .clone()
        .oneshot(invoke_request("svc-1", "", Some(&key)))
        .await
        .unwrap();

    // Not rewritten into a gateway error: backend status and body pass through.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "no such thing");
}

#[tokio::test]
async fn unreachable_backend_maps_to_bad_gateway() {
    let (app, _, providers) = test_app(5);

    // Bind and immediately drop a listener so the port refuses connections.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    providers
        .upsert("svc-1", &format!("http://{addr}/svc"), SECRET)
        .await
        .unwrap();

    let key = issue_key(&app, "alice", 10).await;
    let response = app
        .clone()
        .oneshot(invoke_request("svc-1", "", Some(&key)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"]["code"], "bad_gateway");
}

#[tokio::test]
async fn unusable_endpoint_maps_to_bad_gateway() {
    let (app, _, providers) = test_app(5);
    providers
        .upsert("svc-1", "not a url", SECRET)
        .await
        .unwrap();

    let key = issue_key(&app, "alice", 10).await;
    let response = app
        .clone()
        .oneshot(invoke_request("svc-1", "", Some(&key)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn slow_backend_maps_to_gateway_timeout() {
    // 1 second client timeout against a backend that stalls for 3.
    let (app, _, providers) = test_app(1);

    let backend = Router::new().route(
        "/svc",
        any(|| async {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            "too late"
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, backend).await.unwrap();
    });

    providers
        .upsert("svc-1", &format!("http://{addr}/svc"), SECRET)
        .await
        .unwrap();

    let key = issue_key(&app, "alice", 10).await;
    let response = app
        .clone()
        .oneshot(invoke_request("svc-1", "", Some(&key)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_json(response).await["error"]["code"], "gateway_timeout");
}

#[tokio::test]
async fn invoke_without_credential_is_unauthorized() {
    let (app, _, providers) = test_app(5);
    providers
        .upsert("svc-1", "http://127.0.0.1:9/svc", SECRET)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(invoke_request("svc-1", "", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "missing_credential"
    );
}

#[tokio::test]
async fn unknown_provider_is_distinguishable() {
    let (app, _, _) = test_app(5);

    let key = issue_key(&app, "alice", 10).await;
    let response = app
        .clone()
        .oneshot(invoke_request("ghost", "", Some(&key)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "unknown_provider"
    );
}

#[tokio::test]
async fn exhausted_quota_returns_429_and_spends_nothing_more() {
    let (app, keys, providers) = test_app(5);
    let (addr, _captured) = spawn_backend().await;
    providers
        .upsert("svc-1", &format!("http://{addr}/svc"), SECRET)
        .await
        .unwrap();

    let key = issue_key(&app, "alice", 1).await;

    let response = app
        .clone()
        .oneshot(invoke_request("svc-1", "", Some(&key)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(invoke_request("svc-1", "", Some(&key)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["error"]["code"], "quota_exceeded");

    use tenant_gateway::services::issuer::hash_key;
    use tenant_gateway::store::KeyStore;
    let record = keys.get_key(&hash_key(&key)).await.unwrap().unwrap();
    assert_eq!(record.quota_remaining, 0);
}
