//! Tests for registration, login, refresh rotation, and profile handling.

mod common;

use common::{create_test_server, register};
use serde_json::{Value, json};

#[tokio::test]
async fn test_register_returns_user_tokens_and_cookie() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "new@example.com",
            "password": "secret1",
            "name": "New User",
        }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "new@example.com");
    assert_eq!(body["data"]["user"]["role"], "user");
    assert!(body["data"]["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    // Sensitive fields never leave the server.
    assert!(body["data"]["user"].get("password_hash").is_none());
    assert!(body["data"]["user"].get("refresh_fingerprint").is_none());

    // Refresh token set as an HTTP-only cookie.
    let cookie = response.cookie("ladle_refresh");
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.http_only(), Some(true));
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let (server, _) = create_test_server();
    register(&server, "dup@example.com", "secret1").await;

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "Dup@Example.com",
            "password": "another1",
            "name": "Someone Else",
        }))
        .await;

    // Case differences don't dodge the uniqueness check.
    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_register_weak_password_rejected() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "weak@example.com",
            "password": "short",
            "name": "Weak",
        }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_register_invalid_email_rejected() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "not-an-email",
            "password": "secret1",
            "name": "Bad Email",
        }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let (server, _) = create_test_server();
    register(&server, "a@x.com", "secret1").await;

    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "a@x.com", "password": "wrong-password" }))
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_register_login_refresh_flow() {
    let (server, _) = create_test_server();
    register(&server, "a@x.com", "secret1").await;

    // Login returns access token + refresh cookie.
    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "a@x.com", "password": "secret1" }))
        .await;
    assert_eq!(login.status_code(), 200);
    let login_body: Value = login.json();
    let original_access = login_body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_owned();
    let user_id = login_body["data"]["user"]["id"].clone();
    let refresh_cookie = login.cookie("ladle_refresh");

    // Exchange the refresh cookie for a new access token.
    let refresh = server
        .post("/api/v1/auth/refresh")
        .add_cookie(refresh_cookie)
        .await;
    assert_eq!(refresh.status_code(), 200);
    let refresh_body: Value = refresh.json();
    let new_access = refresh_body["data"]["access_token"]
        .as_str()
        .expect("new access token")
        .to_owned();

    assert_ne!(new_access, original_access);

    // Same identity claims behind both tokens.
    let profile = server
        .get("/api/v1/auth/profile")
        .authorization_bearer(&new_access)
        .await;
    assert_eq!(profile.status_code(), 200);
    let profile_body: Value = profile.json();
    assert_eq!(profile_body["data"]["id"], user_id);
    assert_eq!(profile_body["data"]["email"], "a@x.com");
}

#[tokio::test]
async fn test_refresh_accepts_token_in_body() {
    let (server, _) = create_test_server();
    register(&server, "body@x.com", "secret1").await;

    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "body@x.com", "password": "secret1" }))
        .await;
    let refresh_token = login.cookie("ladle_refresh").value().to_owned();

    let response = server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .await;

    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_refresh_without_token_unauthorized() {
    let (server, _) = create_test_server();

    let response = server.post("/api/v1/auth/refresh").await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_second_login_invalidates_first_refresh_token() {
    let (server, _) = create_test_server();
    register(&server, "rotate@x.com", "secret1").await;

    let first = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "rotate@x.com", "password": "secret1" }))
        .await;
    let first_refresh = first.cookie("ladle_refresh").value().to_owned();

    let second = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "rotate@x.com", "password": "secret1" }))
        .await;
    let second_refresh = second.cookie("ladle_refresh").value().to_owned();

    // The stale token is cryptographically valid but no longer fingerprinted.
    let stale = server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": first_refresh }))
        .await;
    assert_eq!(stale.status_code(), 401);

    let current = server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": second_refresh }))
        .await;
    assert_eq!(current.status_code(), 200);
}

#[tokio::test]
async fn test_logout_invalidates_refresh_token() {
    let (server, _) = create_test_server();
    register(&server, "out@x.com", "secret1").await;

    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "out@x.com", "password": "secret1" }))
        .await;
    let refresh_token = login.cookie("ladle_refresh").value().to_owned();
    let body: Value = login.json();
    let access = body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_owned();

    let logout = server
        .post("/api/v1/auth/logout")
        .authorization_bearer(&access)
        .await;
    assert_eq!(logout.status_code(), 200);

    let response = server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_profile_requires_token() {
    let (server, _) = create_test_server();

    let missing = server.get("/api/v1/auth/profile").await;
    assert_eq!(missing.status_code(), 401);

    let garbage = server
        .get("/api/v1/auth/profile")
        .authorization_bearer("garbage-token")
        .await;
    assert_eq!(garbage.status_code(), 401);
}

#[tokio::test]
async fn test_profile_update() {
    let (server, _) = create_test_server();
    let access = register(&server, "prof@x.com", "secret1").await;

    let response = server
        .patch("/api/v1/auth/profile")
        .authorization_bearer(&access)
        .json(&json!({ "name": "Renamed", "photo_url": "https://img.example/me.png" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["photo_url"], "https://img.example/me.png");
    assert_eq!(body["data"]["email"], "prof@x.com");
}

#[tokio::test]
async fn test_federated_login_creates_account_on_first_use() {
    let (server, _) = create_test_server();

    let first = server
        .post("/api/v1/auth/federated")
        .json(&json!({ "federated_id": "ext-1", "email": "fed@x.com" }))
        .await;
    assert_eq!(first.status_code(), 200);
    let first_body: Value = first.json();
    assert_eq!(first_body["data"]["user"]["provider"], "federated");

    let second = server
        .post("/api/v1/auth/federated")
        .json(&json!({ "federated_id": "ext-1", "email": "fed@x.com" }))
        .await;
    assert_eq!(second.status_code(), 200);
    let second_body: Value = second.json();
    assert_eq!(
        first_body["data"]["user"]["id"],
        second_body["data"]["user"]["id"]
    );
}
