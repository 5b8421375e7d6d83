//! Common test utilities for server integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};

use ladle_core::{AuthProvider, EmailAddress, Role, UserId};
use ladle_server::config::Config;
use ladle_server::models::Identity;
use ladle_server::routes;
use ladle_server::state::AppState;
use ladle_server::store::{CatalogStore, CredentialStore, MemoryStore, OrderStore};

/// Configuration for tests: in-memory store, fixed secrets.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".parse().expect("ip"),
        port: 0,
        database_url: None,
        access_token_secret: SecretString::from("access-test-secret-0123456789abcdef"),
        refresh_token_secret: SecretString::from("refresh-test-secret-0123456789abcdef"),
        access_token_ttl_minutes: 15,
        refresh_token_ttl_days: 7,
    }
}

/// Create a test server over a fresh in-memory store.
///
/// The store is returned too so tests can seed records that have no public
/// endpoint (e.g. admin accounts).
pub fn create_test_server() -> (TestServer, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        test_config(),
        Arc::clone(&store) as Arc<dyn CredentialStore>,
        Arc::clone(&store) as Arc<dyn CatalogStore>,
        Arc::clone(&store) as Arc<dyn OrderStore>,
    );

    let app = routes::router().with_state(state);
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, store)
}

/// Register an account and return its access token.
pub async fn register(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": email,
            "password": password,
            "name": "Test User",
        }))
        .await;
    assert_eq!(response.status_code(), 201, "register should succeed");

    let body: Value = response.json();
    body["data"]["access_token"]
        .as_str()
        .expect("access token in response")
        .to_owned()
}

/// Create a catalog item and return its id.
pub async fn create_item(
    server: &TestServer,
    token: &str,
    name: &str,
    price: u32,
    stock: u32,
) -> String {
    let response = server
        .post("/api/v1/items")
        .authorization_bearer(token)
        .json(&json!({
            "name": name,
            "image_url": "https://img.example/item.png",
            "category": "soup",
            "price": price,
            "stock_quantity": stock,
        }))
        .await;
    assert_eq!(response.status_code(), 201, "item creation should succeed");

    let body: Value = response.json();
    body["data"]["id"].as_str().expect("item id").to_owned()
}

/// Place an order and return the created order record.
pub async fn place_order(server: &TestServer, token: &str, item_id: &str, quantity: u32) -> Value {
    let response = server
        .post("/api/v1/orders")
        .authorization_bearer(token)
        .json(&json!({
            "item_id": item_id,
            "quantity": quantity,
            "buyer_name": "Buyer",
        }))
        .await;
    assert_eq!(response.status_code(), 201, "order placement should succeed");

    let body: Value = response.json();
    body["data"].clone()
}

/// Seed an admin account that logs in via the federated endpoint.
pub async fn seed_admin(store: &MemoryStore, email: &str, federated_id: &str) {
    let now = Utc::now();
    store
        .insert_identity(Identity {
            id: UserId::new(),
            email: EmailAddress::parse(email).expect("valid email"),
            name: "Admin".to_owned(),
            photo_url: None,
            password_hash: None,
            federated_id: Some(federated_id.to_owned()),
            provider: AuthProvider::Federated,
            role: Role::Admin,
            active: true,
            refresh_fingerprint: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("seed admin");
}

/// Federated login; returns the access token.
pub async fn federated_login(server: &TestServer, email: &str, federated_id: &str) -> String {
    let response = server
        .post("/api/v1/auth/federated")
        .json(&json!({
            "federated_id": federated_id,
            "email": email,
        }))
        .await;
    assert_eq!(response.status_code(), 200, "federated login should succeed");

    let body: Value = response.json();
    body["data"]["access_token"]
        .as_str()
        .expect("access token in response")
        .to_owned()
}
