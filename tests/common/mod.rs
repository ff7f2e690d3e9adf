//! Test helpers for Web API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};
use teahouse::web::{create_router, AppState};
use teahouse::{Config, Database};

/// Create a test server with an in-memory database.
pub async fn create_test_server() -> (TestServer, Arc<AppState>) {
    let (server, state, _db) = create_test_server_with_db().await;
    (server, state)
}

/// Like [`create_test_server`], also handing out the database.
pub async fn create_test_server_with_db() -> (TestServer, Arc<AppState>, Database) {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let state = Arc::new(AppState::new(db.clone(), &Config::default()));

    let router = create_router(state.clone(), &[]);
    let server = TestServer::new(router).expect("Failed to create test server");

    (server, state, db)
}

/// Register a user with the password "pw1".
pub async fn register(server: &TestServer, username: &str) {
    server
        .post("/api/auth/register")
        .json(&json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "password": "pw1"
        }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
}

/// Log in and return the login payload.
pub async fn login(server: &TestServer, username: &str, password: &str) -> Value {
    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "username": username,
            "password": password
        }))
        .await;
    response.json::<Value>()
}

/// Register, log in, and return the session token.
pub async fn register_and_login(server: &TestServer, username: &str) -> String {
    register(server, username).await;
    login(server, username, "pw1").await["data"]["session_id"]
        .as_str()
        .expect("login returned no session_id")
        .to_string()
}

/// Register a master account and return its session token.
pub async fn master_session(server: &TestServer, state: &AppState, username: &str) -> String {
    register(server, username).await;
    state
        .accounts
        .grant_master(username)
        .await
        .expect("Failed to grant master");
    login(server, username, "pw1").await["data"]["session_id"]
        .as_str()
        .expect("login returned no session_id")
        .to_string()
}

/// Set flags on `username` as the holder of `token`.
pub async fn grant(server: &TestServer, token: &str, username: &str, permissions: Value) {
    server
        .put(&format!("/api/auth/users/{username}/permissions"))
        .json(&json!({
            "session_id": token,
            "permissions": permissions
        }))
        .await
        .assert_status_ok();
}
