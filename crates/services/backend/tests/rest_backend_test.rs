//! RestBackend against a local stand-in for the hosted service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use backend_client::{AuthApi, Filter, RestBackend, SignOutScope, Table, TableApi};
use common::{AppError, BackendConfig};

const ANON_KEY: &str = "anon-key";

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, HashMap<String, String>, Option<String>)>>>,
}

impl Recorded {
    fn push(&self, path: String, query: HashMap<String, String>, headers: &HeaderMap) {
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((path, query, bearer));
    }

    fn last(&self) -> (String, HashMap<String, String>, Option<String>) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(ANON_KEY)
}

fn user_json() -> Value {
    json!({ "id": "u1", "email": "ada@example.com", "user_metadata": { "role": "admin" } })
}

fn session_json() -> Value {
    json!({
        "access_token": "access-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 4_000_000_000i64,
        "refresh_token": "refresh-1",
        "user": user_json()
    })
}

async fn token(
    State(recorded): State<Recorded>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    recorded.push("token".into(), query.clone(), &headers);
    if !has_api_key(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "No API key found" })));
    }

    match query.get("grant_type").map(String::as_str) {
        Some("password") if body["password"] == "password123" => (StatusCode::OK, Json(session_json())),
        Some("password") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
        ),
        Some("refresh_token") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error_code": "refresh_token_not_found", "msg": "Invalid Refresh Token" })),
        ),
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "msg": "unsupported grant" }))),
    }
}

async fn signup(State(recorded): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    recorded.push("signup".into(), HashMap::new(), &headers);
    let mut user = user_json();
    user["user_metadata"] = body["data"].clone();
    Json(user)
}

async fn logout(
    State(recorded): State<Recorded>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    recorded.push("logout".into(), query, &headers);
    StatusCode::NO_CONTENT
}

async fn user(State(recorded): State<Recorded>, headers: HeaderMap) -> impl IntoResponse {
    recorded.push("user".into(), HashMap::new(), &headers);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer access-1") => (StatusCode::OK, Json(user_json())),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "JWT expired" }))),
    }
}

async fn table(
    State(recorded): State<Recorded>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    recorded.push(name.clone(), query.clone(), &headers);
    match (name.as_str(), query.get("status").map(String::as_str)) {
        ("seller_verifications", Some("eq.pending")) => (
            StatusCode::OK,
            Json(json!([{ "id": "42", "status": "pending", "business_name": "Gadget Heaven" }])),
        ),
        ("seller_verifications", _) => (StatusCode::OK, Json(json!([]))),
        ("categories", _) => (
            StatusCode::CONFLICT,
            Json(json!({ "code": "23505", "message": "duplicate key value violates unique constraint" })),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "boom" }))),
    }
}

async fn patch_table(
    State(recorded): State<Recorded>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> impl IntoResponse {
    recorded.push(name, query.clone(), &headers);
    let prefer = headers.get("prefer").and_then(|v| v.to_str().ok()).unwrap_or_default();
    if prefer != "return=representation" {
        return Json(json!([]));
    }
    let mut row = json!({ "id": query.get("id").map(|v| v.trim_start_matches("eq.")).unwrap_or_default() });
    if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
        row.extend(patch.clone());
    }
    Json(json!([row]))
}

async fn start() -> (RestBackend, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/logout", post(logout))
        .route("/auth/v1/user", get(user))
        .route("/rest/v1/:table", get(table).post(table).patch(patch_table))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = BackendConfig::new(format!("http://{}/", addr), ANON_KEY);
    (RestBackend::new(&config).unwrap(), recorded)
}

#[tokio::test]
async fn test_sign_in_success_and_failure() {
    let (backend, recorded) = start().await;

    let session = backend
        .sign_in_with_password("ada@example.com", "password123")
        .await
        .unwrap();
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.user.id, "u1");
    let (_, query, _) = recorded.last();
    assert_eq!(query.get("grant_type").map(String::as_str), Some("password"));

    let err = backend
        .sign_in_with_password("ada@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert_eq!(err, AppError::InvalidCredentials);
}

#[tokio::test]
async fn test_sign_up_passes_metadata() {
    let (backend, _) = start().await;

    let response = backend
        .sign_up("ada@example.com", "password123", json!({ "full_name": "Ada", "role": "admin" }))
        .await
        .unwrap();
    assert!(response.session.is_none());
    assert_eq!(response.user.user_metadata["full_name"], "Ada");
}

#[tokio::test]
async fn test_sign_out_uses_scope_and_token() {
    let (backend, recorded) = start().await;

    backend.sign_out("access-1", SignOutScope::Global).await.unwrap();
    let (path, query, bearer) = recorded.last();
    assert_eq!(path, "logout");
    assert_eq!(query.get("scope").map(String::as_str), Some("global"));
    assert_eq!(bearer.as_deref(), Some("Bearer access-1"));
}

#[tokio::test]
async fn test_expired_token_and_refresh() {
    let (backend, _) = start().await;

    assert_eq!(backend.get_user("stale").await.unwrap_err(), AppError::SessionExpired);
    assert_eq!(backend.get_user("access-1").await.unwrap().id, "u1");
    assert_eq!(
        backend.refresh_session("refresh-0").await.unwrap_err(),
        AppError::SessionExpired
    );
}

#[tokio::test]
async fn test_select_builds_equality_filter() {
    let (backend, recorded) = start().await;

    let rows = backend
        .select(Table::SellerVerifications, &Filter::new().eq("status", "pending"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "42");

    let (path, query, bearer) = recorded.last();
    assert_eq!(path, "seller_verifications");
    assert_eq!(query.get("select").map(String::as_str), Some("*"));
    assert_eq!(bearer.as_deref(), Some("Bearer anon-key"));
}

#[tokio::test]
async fn test_update_uses_session_token() {
    let (backend, recorded) = start().await;
    backend.set_access_token(Some("access-1".into()));

    let rows = backend
        .update(
            Table::SellerVerifications,
            &Filter::by_id("42"),
            json!({ "status": "verified" }),
        )
        .await
        .unwrap();
    assert_eq!(rows[0]["id"], "42");
    assert_eq!(rows[0]["status"], "verified");

    let (_, query, bearer) = recorded.last();
    assert_eq!(query.get("id").map(String::as_str), Some("eq.42"));
    assert_eq!(bearer.as_deref(), Some("Bearer access-1"));
}

#[tokio::test]
async fn test_remote_errors_are_normalized() {
    let (backend, _) = start().await;

    let err = backend
        .insert(Table::Categories, json!({ "name": "Audio", "slug": "audio" }))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = backend.select(Table::Products, &Filter::new()).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let config = BackendConfig {
        url: "http://127.0.0.1:9".into(),
        anon_key: ANON_KEY.into(),
        request_timeout_ms: 500,
    };
    let backend = RestBackend::new(&config).unwrap();

    let err = backend.select(Table::Products, &Filter::new()).await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)));
}
