//! Smoke tests against a running server
//!
//! Run with: cargo test --test live_server -- --ignored
//! The server must have an administrator matching BIBLIO_TEST_ADMIN_EMAIL /
//! BIBLIO_TEST_ADMIN_PASSWORD.

use reqwest::Client;
use serde_json::{json, Value};

fn base_url() -> String {
    std::env::var("BIBLIO_TEST_URL").unwrap_or_else(|_| "http://localhost:8080/api".to_string())
}

/// Helper to get an administrator token
async fn get_auth_token(client: &Client) -> String {
    let email = std::env::var("BIBLIO_TEST_ADMIN_EMAIL").unwrap_or_else(|_| "admin@biblio.local".to_string());
    let password = std::env::var("BIBLIO_TEST_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

    let response = client
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": "nobody@biblio.local", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_get_current_user() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["role"], "ADMIN");
}

#[tokio::test]
#[ignore]
async fn test_book_loan_round_trip() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/books", base_url()))
        .bearer_auth(&token)
        .json(&json!({ "title": "Smoke Test Book", "author": "Nobody", "copies": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let book: Value = response.json().await.expect("Failed to parse response");
    let book_id = book["id"].as_str().expect("No book ID").to_string();

    let response = client
        .post(format!("{}/loans", base_url()))
        .bearer_auth(&token)
        .json(&json!({ "bookId": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["status"], "BORROWED");

    let response = client
        .patch(format!("{}/loans/{}/return", base_url(), loan["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Cleanup
    let response = client
        .delete(format!("{}/books/{}", base_url(), book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_get_dashboard() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/dashboard", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["books"].is_number());
    assert!(body["activeLoans"].is_number());
    assert!(body["overdueLoans"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", base_url()))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}
