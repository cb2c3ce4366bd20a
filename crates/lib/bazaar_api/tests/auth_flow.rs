//! End-to-end auth flow through the router, backed by in-memory stores.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use bazaar_api::{AppState, config::ApiConfig};
use bazaar_core::auth::TokenAuthority;
use bazaar_core::auth::memory::{MemoryTokenLedger, MemoryUserStore};
use bazaar_core::config::AuthConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let authority = TokenAuthority::new(
        AuthConfig::new("test-access-secret", "test-refresh-secret").expect("auth config"),
        Arc::new(MemoryUserStore::new()),
        Arc::new(MemoryTokenLedger::new()),
    );
    bazaar_api::router(AppState {
        authority: Arc::new(authority),
        config: ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            cors_origin: None,
        },
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    (status, json)
}

async fn register(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        Some(json!({"email": email, "nickname": "tester", "password": password})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn login(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        Some(json!({"email": email, "password": password})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

fn token<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field].as_str().expect("token field")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn register_returns_public_profile_and_rejects_duplicates() {
    let app = app();
    let user = register(&app, "a@x.com", "password1").await;
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["nickname"], "tester");
    assert!(user.get("passwordHash").is_none());
    assert!(user.get("createdAt").is_some());

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({"email": "a@x.com", "nickname": "again", "password": "password1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn register_missing_fields_is_bad_request() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({"email": "a@x.com"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn login_failures_are_generic() {
    let app = app();
    register(&app, "a@x.com", "password1").await;

    let (wrong_status, wrong) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"email": "a@x.com", "password": "nope-nope"})),
        None,
    )
    .await;
    let (unknown_status, unknown) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"email": "b@x.com", "password": "password1"})),
        None,
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn login_returns_token_pair() {
    let app = app();
    register(&app, "a@x.com", "password1").await;
    let body = login(&app, "a@x.com", "password1").await;

    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 3600);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert!(!token(&body, "accessToken").is_empty());
    assert!(!token(&body, "refreshToken").is_empty());
}

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let app = app();
    register(&app, "a@x.com", "password1").await;
    let first = login(&app, "a@x.com", "password1").await;
    let rt1 = token(&first, "refreshToken");

    let (status, second) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        Some(json!({"refreshToken": rt1})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rt2 = token(&second, "refreshToken");
    assert_ne!(rt1, rt2);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        Some(json!({"refreshToken": rt1})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        Some(json!({"refreshToken": rt2})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_token_is_bad_request() {
    let app = app();
    let (status, _) = send(&app, Method::POST, "/auth/refresh", Some(json!({})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_requires_bearer_token() {
    let app = app();
    register(&app, "a@x.com", "password1").await;
    let session = login(&app, "a@x.com", "password1").await;

    let (status, _) = send(&app, Method::GET, "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/users/me", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Refresh tokens are signed with a different key and must not pass.
    let (status, _) = send(
        &app,
        Method::GET,
        "/users/me",
        None,
        Some(token(&session, "refreshToken")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = send(
        &app,
        Method::GET,
        "/users/me",
        None,
        Some(token(&session, "accessToken")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "a@x.com");
}

#[tokio::test]
async fn update_me_changes_profile() {
    let app = app();
    register(&app, "a@x.com", "password1").await;
    let session = login(&app, "a@x.com", "password1").await;

    let (status, me) = send(
        &app,
        Method::PUT,
        "/users/me",
        Some(json!({"nickname": "renamed", "image": "avatar.png"})),
        Some(token(&session, "accessToken")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["nickname"], "renamed");
    assert_eq!(me["image"], "avatar.png");
}

#[tokio::test]
async fn logout_single_session() {
    let app = app();
    register(&app, "a@x.com", "password1").await;
    let session = login(&app, "a@x.com", "password1").await;
    let rt = token(&session, "refreshToken");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/logout",
        Some(json!({"refreshToken": rt})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["revoked"], 1);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/refresh",
        Some(json!({"refreshToken": rt})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/auth/logout", Some(json!({})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_all_devices_requires_authentication() {
    let app = app();
    register(&app, "a@x.com", "password1").await;
    let laptop = login(&app, "a@x.com", "password1").await;
    let phone = login(&app, "a@x.com", "password1").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/logout",
        Some(json!({"allDevices": true})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/logout",
        Some(json!({"allDevices": true})),
        Some(token(&laptop, "accessToken")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], 2);

    for session in [&laptop, &phone] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/auth/refresh",
            Some(json!({"refreshToken": token(session, "refreshToken")})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn change_password_flow() {
    let app = app();
    register(&app, "a@x.com", "password1").await;
    let session = login(&app, "a@x.com", "password1").await;
    let access = token(&session, "accessToken");

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/users/me/password",
        Some(json!({"oldPassword": "wrong-password", "newPassword": "password2"})),
        Some(access),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/users/me/password",
        Some(json!({"oldPassword": "password1", "newPassword": "password2"})),
        Some(access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    login(&app, "a@x.com", "password2").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"email": "a@x.com", "password": "password1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
