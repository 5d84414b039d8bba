//! Tests for the HTTP routes, driven through the full router.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use parley_crypto::{CredentialHasher, HashParams};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::build_router;
use crate::auth::JwtManager;
use crate::state::AppState;
use crate::storage::ChatDatabase;

async fn setup() -> (Router, AppState) {
    let db = ChatDatabase::open_in_memory().await.unwrap();
    let jwt = JwtManager::new(b"test-secret", 3600, 86400).unwrap();
    let hasher = CredentialHasher::new(HashParams {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    let state = AppState::new(db, jwt, hasher, 32);
    (build_router(state.clone()), state)
}

async fn call(app: &Router, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Register and log in, returning (access, refresh).
async fn signup(app: &Router, username: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/users",
        None,
        Some(json!({"username": username, "email": format!("{username}@example.com"), "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], username);

    let (status, body) = call(
        app,
        Method::POST,
        "/login",
        None,
        Some(json!({"username": username, "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], username);
    (
        body["accessToken"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (app, _state) = setup().await;
    signup(&app, "alice").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/users",
        None,
        Some(json!({"username": "alice", "email": "x@example.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn bad_login_is_unauthorized() {
    let (app, _state) = setup().await;
    signup(&app, "alice").await;

    let (status, wrong) = call(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({"username": "alice", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, unknown) = call(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({"username": "nobody", "password": "password123"})),
    )
    .await;
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn protected_routes_need_an_access_token() {
    let (app, _state) = setup().await;
    let (access, refresh) = signup(&app, "alice").await;

    let (status, _) = call(&app, Method::GET, "/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/users", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/users", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"username": "alice", "email": "alice@example.com"}]));
}

#[tokio::test]
async fn refresh_rotates_and_old_value_is_dead() {
    let (app, _state) = setup().await;
    let (access, refresh) = signup(&app, "alice").await;

    let (status, _) = call(&app, Method::POST, "/refresh", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::POST, "/refresh", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["refreshToken"].as_str().unwrap().to_string();
    assert!(body["accessToken"].is_string());

    let (status, _) = call(&app, Method::POST, "/refresh", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::POST, "/logout", Some(&rotated), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::POST, "/refresh", Some(&rotated), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn history_endpoints_reflect_stored_messages() {
    let (app, state) = setup().await;
    let (alice, _) = signup(&app, "alice").await;

    let first = state.messages.create("alice", "bob", "hi bob").await.unwrap();
    state.messages.create("bob", "alice", "hi alice").await.unwrap();
    state.messages.create("carol", "alice", "hey").await.unwrap();

    let (status, chats) = call(&app, Method::GET, "/chats", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chats[0]["username"], "carol");
    assert_eq!(chats[1]["username"], "bob");
    assert_eq!(chats[1]["last_message"], "hi alice");

    let (status, thread) = call(&app, Method::GET, "/messages?user=bob", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let thread = thread.as_array().unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0]["id"], first.id);
    assert_eq!(thread[0]["from"], "alice");
    assert_eq!(thread[0]["to"], "bob");
    assert!(thread[0]["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn delete_account_keeps_access_token_alive() {
    let (app, _state) = setup().await;
    let (access, refresh) = signup(&app, "alice").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/delete",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::POST, "/refresh", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/users", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn sealed_text_round_trip_and_wrong_password() {
    let (app, _state) = setup().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/encrypt",
        None,
        Some(json!({"text": "attack at dawn", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let crypt = body["crypt"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        "/decrypt",
        None,
        Some(json!({"text": crypt, "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "attack at dawn");

    let (status, body) = call(
        &app,
        Method::POST,
        "/decrypt",
        None,
        Some(json!({"text": crypt, "password": "not-pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "crypto_error");
}

#[tokio::test]
async fn websocket_without_valid_token_is_rejected_before_upgrade() {
    let (app, _state) = setup().await;

    let (status, _) = call(&app, Method::GET, "/ws", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/ws?token=forged", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
