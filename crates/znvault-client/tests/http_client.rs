//! Integration tests for the HTTP client against a local stub of the vault API.
//!
//! The stub is an axum router bound to an ephemeral port. It checks the API
//! key, records what it receives, and serves canned secrets.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value, json};

use znvault_client::{
    ClientConfig, ListQuery, NewSecret, SecretBackend, SecretSubType, SecretType, VaultError,
    ZnVault,
};

const API_KEY: &str = "test-key";

#[derive(Clone, Default)]
struct Stub {
    list_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    created: Arc<Mutex<Vec<Value>>>,
    health_failures_left: Arc<AtomicU32>,
    health_hits: Arc<AtomicU32>,
    unrouted_hits: Arc<AtomicU32>,
}

fn secret_json(id: &str, alias: &str) -> Value {
    json!({
        "id": id,
        "alias": alias,
        "type": "credential",
        "subType": "password",
        "version": 4,
        "tags": ["prod"],
        "createdAt": "2025-01-01T00:00:00.000Z",
        "updatedAt": "2025-02-01T00:00:00.000Z",
        "tenantId": "acme"
    })
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(API_KEY) => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized", "message": "invalid API key"})),
        )
            .into_response()),
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "Not Found", "message": "Secret not found"})),
    )
        .into_response()
}

async fn by_alias(headers: HeaderMap, Path(alias): Path<String>) -> Response {
    if let Err(resp) = authorized(&headers) {
        return resp;
    }
    if alias == "api/production/db" {
        Json(secret_json("id-1", &alias)).into_response()
    } else {
        not_found()
    }
}

async fn by_id(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(resp) = authorized(&headers) {
        return resp;
    }
    if id == "id-1" {
        Json(secret_json("id-1", "api/production/db")).into_response()
    } else {
        not_found()
    }
}

async fn decrypt(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(resp) = authorized(&headers) {
        return resp;
    }
    if id != "id-1" {
        return not_found();
    }
    let mut body = secret_json("id-1", "api/production/db");
    body["data"] = json!({"username": "app", "password": "hunter2"});
    Json(body).into_response()
}

async fn list(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(resp) = authorized(&headers) {
        return resp;
    }
    stub.list_queries.lock().unwrap().push(params);
    let mut leaky = secret_json("id-2", "api/staging/db");
    leaky["data"] = json!({"password": "should-not-surface"});
    Json(json!({
        "total": 12,
        "page": 2,
        "pageSize": 10,
        "totalPages": 2,
        "items": [secret_json("id-1", "api/production/db"), leaky]
    }))
    .into_response()
}

async fn create(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(resp) = authorized(&headers) {
        return resp;
    }
    stub.created.lock().unwrap().push(body.clone());
    let alias = body["alias"].as_str().unwrap_or_default().to_owned();
    if alias == "taken" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": "Conflict", "message": "alias 'taken' already exists"})),
        )
            .into_response();
    }
    let mut created = secret_json("id-new", &alias);
    created["version"] = json!(1);
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn health(State(stub): State<Stub>) -> Response {
    stub.health_hits.fetch_add(1, Ordering::SeqCst);
    let left = stub.health_failures_left.load(Ordering::SeqCst);
    if left > 0 {
        stub.health_failures_left.store(left - 1, Ordering::SeqCst);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"message": "warming up"})),
        )
            .into_response();
    }
    Json(json!({
        "status": "ok",
        "version": "2.3.1",
        "uptime": 1234.5,
        "timestamp": "2025-03-01T00:00:00.000Z",
        "checks": {"database": {"status": "ok"}}
    }))
    .into_response()
}

async fn unrouted(State(stub): State<Stub>) -> Response {
    stub.unrouted_hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND.into_response()
}

/// Start the stub and return its base URL.
async fn spawn_stub(stub: Stub) -> String {
    let app = Router::new()
        .route("/v1/secrets", get(list).post(create))
        .route("/v1/secrets/alias/{*alias}", get(by_alias))
        .route("/v1/secrets/{id}", get(by_id))
        .route("/v1/secrets/{id}/decrypt", post(decrypt))
        .route("/v1/health", get(health))
        .fallback(unrouted)
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str, api_key: &str, max_retries: u32) -> ZnVault {
    ZnVault::with_config(ClientConfig {
        base_url: base_url.to_owned(),
        api_key: api_key.to_owned(),
        timeout: Duration::from_secs(5),
        max_retries,
        ..ClientConfig::default()
    })
    .unwrap()
}

// ── Lookups ──────────────────────────────────────────────────────────

#[tokio::test]
async fn alias_lookup_keeps_path_separators() {
    let url = spawn_stub(Stub::default()).await;
    let secret = client(&url, API_KEY, 0)
        .secret_by_alias("api/production/db")
        .await
        .unwrap();
    assert_eq!(secret.id, "id-1");
    assert_eq!(secret.sub_type, Some(SecretSubType::Password));
    assert_eq!(secret.version, 4);
}

#[tokio::test]
async fn dot_segments_never_leave_the_secret_routes() {
    let stub = Stub::default();
    let url = spawn_stub(stub.clone()).await;
    let vault = client(&url, API_KEY, 0);

    for alias in ["../../health", "api/../../health", "%2e%2E/%2E%2e/health", "."] {
        let err = vault.secret_by_alias(alias).await.unwrap_err();
        assert!(matches!(err, VaultError::Invalid(_)), "{alias}: {err}");
    }
    for id in ["..", "%2e%2e"] {
        assert!(matches!(vault.secret_by_id(id).await, Err(VaultError::Invalid(_))));
        assert!(matches!(vault.decrypt(id).await, Err(VaultError::Invalid(_))));
    }

    assert_eq!(stub.health_hits.load(Ordering::SeqCst), 0);
    assert_eq!(stub.unrouted_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dots_inside_segments_are_ordinary_characters() {
    let url = spawn_stub(Stub::default()).await;
    let err = client(&url, API_KEY, 0)
        .secret_by_alias("api/v1.2/...")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");
}

#[tokio::test]
async fn missing_secret_maps_to_not_found() {
    let url = spawn_stub(Stub::default()).await;
    let err = client(&url, API_KEY, 3)
        .secret_by_id("not-a-real-key")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, VaultError::NotFound { resource } if resource == "not-a-real-key"),
        "unexpected error: {err}"
    );
    assert!(err.to_string().contains("not-a-real-key"));
}

#[tokio::test]
async fn bad_api_key_maps_to_auth() {
    let url = spawn_stub(Stub::default()).await;
    let err = client(&url, "wrong", 0).secret_by_id("id-1").await.unwrap_err();
    assert!(matches!(err, VaultError::Auth(msg) if msg == "invalid API key"));
}

#[tokio::test]
async fn decrypt_returns_data() {
    let url = spawn_stub(Stub::default()).await;
    let decrypted = client(&url, API_KEY, 0).decrypt("id-1").await.unwrap();
    assert_eq!(decrypted.secret.alias, "api/production/db");
    assert_eq!(decrypted.data["password"], "hunter2");
}

// ── Listing & creation ───────────────────────────────────────────────

#[tokio::test]
async fn list_sends_filters_as_query_string() {
    let stub = Stub::default();
    let url = spawn_stub(stub.clone()).await;
    let page = client(&url, API_KEY, 0)
        .list(&ListQuery {
            secret_type: Some(SecretType::Credential),
            alias_prefix: Some("api/".into()),
            tags: vec!["prod".into(), "db".into()],
            page: 2,
            page_size: 10,
        })
        .await
        .unwrap();

    assert_eq!(page.total, 12);
    assert_eq!(page.items.len(), 2);

    let queries = stub.list_queries.lock().unwrap().clone();
    let q = &queries[0];
    assert_eq!(q["type"], "credential");
    assert_eq!(q["aliasPrefix"], "api/");
    assert_eq!(q["tags"], "prod,db");
    assert_eq!(q["page"], "2");
    assert_eq!(q["pageSize"], "10");
}

#[tokio::test]
async fn create_posts_camel_case_body() {
    let stub = Stub::default();
    let url = spawn_stub(stub.clone()).await;
    let mut data = serde_json::Map::new();
    data.insert("token".into(), json!("abc"));

    let created = client(&url, API_KEY, 0)
        .create(&NewSecret {
            alias: "ci/token".into(),
            secret_type: SecretType::Credential,
            sub_type: Some(SecretSubType::ApiKey),
            data,
            tags: vec![],
            expires_at: Some("2030-01-01T00:00:00Z".into()),
        })
        .await
        .unwrap();
    assert_eq!(created.alias, "ci/token");
    assert_eq!(created.version, 1);

    let body = stub.created.lock().unwrap()[0].clone();
    assert_eq!(body["subType"], "api_key");
    assert_eq!(body["expiresAt"], "2030-01-01T00:00:00Z");
    assert!(body.get("tags").is_none());
}

#[tokio::test]
async fn create_conflict_carries_backend_message() {
    let url = spawn_stub(Stub::default()).await;
    let mut data = serde_json::Map::new();
    data.insert("k".into(), json!("v"));
    let err = client(&url, API_KEY, 3)
        .create(&NewSecret {
            alias: "taken".into(),
            secret_type: SecretType::Opaque,
            sub_type: None,
            data,
            tags: vec![],
            expires_at: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Conflict(msg) if msg.contains("already exists")));
}

// ── Retry policy ─────────────────────────────────────────────────────

#[tokio::test]
async fn transient_failures_are_retried() {
    let stub = Stub::default();
    stub.health_failures_left.store(1, Ordering::SeqCst);
    let url = spawn_stub(stub.clone()).await;

    let health = client(&url, API_KEY, 2).health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version.as_deref(), Some("2.3.1"));
    assert_eq!(stub.health_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retry_budget_is_bounded() {
    let stub = Stub::default();
    stub.health_failures_left.store(10, Ordering::SeqCst);
    let url = spawn_stub(stub.clone()).await;

    let err = client(&url, API_KEY, 0).health().await.unwrap_err();
    assert!(matches!(err, VaultError::Unavailable(ref message) if message == "warming up"));
    assert_eq!(stub.health_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"), API_KEY, 0)
        .health()
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Network(_)), "unexpected error: {err}");
}
