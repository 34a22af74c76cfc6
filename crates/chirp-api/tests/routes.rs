use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use chirp_api::{AppStateInner, router};
use chirp_backend::MemoryStore;
use chirp_service::ChirpService;

fn app() -> Router {
    let service = ChirpService::open(Arc::new(MemoryStore::new())).unwrap();
    router(Arc::new(AppStateInner { service }))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

#[tokio::test]
async fn register_then_conflict() {
    let app = app();

    let (status, body) = call(&app, Method::POST, "/users", Some(json!({"username": "alice"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"username": "alice"}));

    let (status, body) = call(&app, Method::POST, "/users", Some(json!({"username": "alice"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("alice"));

    let (status, _) = call(&app, Method::POST, "/users", Some(json!({"username": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = app();

    let (status, body) = call(&app, Method::POST, "/users", Some(json!({"name": "alice"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, Method::POST, "/chirps", Some(json!({"username": "alice"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chirp_lifecycle() {
    let app = app();
    call(&app, Method::POST, "/users", Some(json!({"username": "bob"}))).await;

    let (status, root) = call(&app, Method::POST, "/chirps", Some(json!({"username": "bob", "text": "hello"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(root["id"], 1);
    assert_eq!(root["parent_id"], 0);

    let (status, reply) = call(
        &app,
        Method::POST,
        "/chirps",
        Some(json!({"username": "bob", "text": "world", "parent_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["id"], 2);

    let (status, edited) = call(
        &app,
        Method::PUT,
        "/chirps/2",
        Some(json!({"username": "bob", "text": "world!"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["text"], "world!");

    let (status, thread) = call(&app, Method::GET, "/chirps/1", None).await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<&str> = thread.as_array().unwrap().iter().map(|c| c["text"].as_str().unwrap()).collect();
    assert_eq!(texts, ["hello", "world!"]);

    let (status, _) = call(&app, Method::DELETE, "/chirps/1?username=bob", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, "/chirps/1?username=bob", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::GET, "/chirps/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, ids) = call(&app, Method::GET, "/users/bob/chirps", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids, json!([2]));
}

#[tokio::test]
async fn posting_errors_map_to_statuses() {
    let app = app();
    call(&app, Method::POST, "/users", Some(json!({"username": "bob"}))).await;

    let (status, _) = call(&app, Method::POST, "/chirps", Some(json!({"username": "ghost", "text": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/chirps",
        Some(json!({"username": "bob", "text": "hi", "parent_id": 99})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::GET, "/chirps/not-a-number", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn follow_routes() {
    let app = app();
    for name in ["alice", "bob", "carol"] {
        call(&app, Method::POST, "/users", Some(json!({"username": name}))).await;
    }

    let (status, _) = call(&app, Method::POST, "/follows", Some(json!({"username": "alice", "to_follow": "carol"}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::POST, "/follows", Some(json!({"username": "alice", "to_follow": "bob"}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::POST, "/follows", Some(json!({"username": "alice", "to_follow": "bob"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = call(&app, Method::POST, "/follows", Some(json!({"username": "alice", "to_follow": "nobody"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, following) = call(&app, Method::GET, "/users/alice/following", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(following, json!(["bob", "carol"]));

    let (status, _) = call(&app, Method::GET, "/users/nobody/following", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = call(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}
