//! Sign-in, staff accounts and roles.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;

use thriftstore_core::UserRole;
use thriftstore_integration_tests::{TEST_PASSWORD, TestApp};

#[tokio::test]
async fn test_invalid_email_is_a_field_error_and_creates_nobody() {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    let before = app.get("/api/admin/users").await.json();

    let response = app
        .post(
            "/api/admin/users",
            json!({
                "name": "Otieno",
                "email": "not-an-email",
                "password": "a long enough password",
                "role": "order_preparer"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json();
    assert!(body["fields"]["email"].is_string(), "{body}");
    assert!(body["fields"].get("name").is_none());

    let after = app.get("/api/admin/users").await.json();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_create_staff_and_sign_in() {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;

    let response = app
        .post(
            "/api/admin/users",
            json!({
                "name": "Kevin Njoroge",
                "email": "Kevin@Example.com",
                "password": "another long password",
                "role": "product_manager"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json()["email"], "kevin@example.com");

    let mut kevin = app.new_session();
    let response = kevin
        .post(
            "/api/auth/login",
            json!({ "email": "kevin@example.com", "password": "another long password" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let me = kevin.get("/api/auth/me").await.json();
    assert_eq!(me["role"], "product_manager");
    let permissions = me["permissions"].as_array().unwrap();
    assert!(permissions.contains(&json!("manage_catalog")));
    assert!(!permissions.contains(&json!("manage_users")));
}

#[tokio::test]
async fn test_wrong_password_and_logout() {
    let mut app = TestApp::new();
    app.staff("prep@example.com", UserRole::OrderPreparer).await;

    let response = app
        .post(
            "/api/auth/login",
            json!({ "email": "prep@example.com", "password": "wrong password" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .post(
            "/api/auth/login",
            json!({ "email": "prep@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.get("/api/auth/me").await.status, StatusCode::OK);

    let response = app.post("/api/auth/logout", json!({})).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get("/api/auth/me").await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_suspended_account_cannot_sign_in() {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    let rider = app.staff("rider@example.com", UserRole::DeliveryStaff).await;

    let response = app
        .post(
            &format!("/api/admin/users/{}/status", rider.id),
            json!({ "status": "suspended" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let mut rider_session = app.new_session();
    let response = rider_session
        .post(
            "/api/auth/login",
            json!({ "email": "rider@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_cannot_demote_or_delete_themself() {
    let mut app = TestApp::new();
    let admin = app.sign_in_as("admin@example.com", UserRole::Admin).await;

    let response = app
        .post(
            &format!("/api/admin/users/{}/role", admin.id),
            json!({ "role": "order_preparer" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.delete(&format!("/api/admin/users/{}", admin.id)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_role_matrix_lists_every_role() {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;

    let roles = app.get("/api/admin/roles").await.json();
    let roles = roles.as_array().unwrap();
    assert_eq!(roles.len(), UserRole::ALL.len());
    let customer = roles.iter().find(|r| r["role"] == "customer").unwrap();
    assert!(customer["permissions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_account_changes_apply_to_existing_sessions() {
    let mut admin = TestApp::new();
    admin.sign_in_as("admin@example.com", UserRole::Admin).await;
    let mut manager = admin.new_session();
    let pm = manager
        .sign_in_as("manager@example.com", UserRole::ProductManager)
        .await;
    let category = json!({ "name": "Bags" });

    // Demotion drops catalog permissions straight away.
    let response = admin
        .post(
            &format!("/api/admin/users/{}/role", pm.id),
            json!({ "role": "delivery_staff" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let response = manager.post("/api/admin/categories", category.clone()).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(manager.get("/api/auth/me").await.json()["role"], "delivery_staff");

    // Suspension signs the session out.
    let response = admin
        .post(
            &format!("/api/admin/users/{}/status", pm.id),
            json!({ "status": "suspended" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        manager.get("/api/admin/products").await.status,
        StatusCode::UNAUTHORIZED
    );

    // Reactivating does not bring the old session back.
    admin
        .post(
            &format!("/api/admin/users/{}/status", pm.id),
            json!({ "status": "active" }),
        )
        .await;
    assert_eq!(
        manager.get("/api/auth/me").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_deleted_account_session_is_rejected() {
    let mut admin = TestApp::new();
    admin.sign_in_as("admin@example.com", UserRole::Admin).await;
    let mut manager = admin.new_session();
    let pm = manager
        .sign_in_as("manager@example.com", UserRole::ProductManager)
        .await;
    assert_eq!(manager.get("/api/admin/products").await.status, StatusCode::OK);

    let response = admin.delete(&format!("/api/admin/users/{}", pm.id)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert_eq!(
        manager.get("/api/admin/products").await.status,
        StatusCode::UNAUTHORIZED
    );
}
