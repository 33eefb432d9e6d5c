//! Integration tests for the account boundary: registration, login, and the
//! authenticated user endpoint.

use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Helper: start the server on a random port and return its base URL.
async fn start_test_server() -> String {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = hotline_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = hotline_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let state = hotline_server::state::AppState {
        db,
        jwt_secret,
        registry: Arc::new(hotline_server::registry::Registry::new()),
    };

    let app = hotline_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn register_then_duplicate_is_conflict() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/register", base_url))
        .json(&json!({ "phone": "+15550001", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["phone"], "+15550001");
    assert!(body["user_id"].as_str().is_some());

    let resp = client
        .post(format!("{}/api/register", base_url))
        .json(&json!({ "phone": "+15550001", "password": "other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn register_rejects_empty_phone() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/register", base_url))
        .json(&json!({ "phone": "   ", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/register", base_url))
        .json(&json!({ "phone": "+15550001", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Wrong password
    let resp = client
        .post(format!("{}/api/login", base_url))
        .json(&json!({ "phone": "+15550001", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Unknown phone
    let resp = client
        .post(format!("{}/api/login", base_url))
        .json(&json!({ "phone": "+15559999", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn current_user_requires_and_honors_token() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/register", base_url))
        .json(&json!({ "phone": "+15550001", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("{}/api/login", base_url))
        .json(&json!({ "phone": "+15550001", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    // No token -> 401
    let resp = client
        .get(format!("{}/api/user", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Bearer token -> the account
    let resp = client
        .get(format!("{}/api/user", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["phone"], "+15550001");
}
