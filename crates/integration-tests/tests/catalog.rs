//! Catalog management through the back office API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use thriftstore_core::UserRole;
use thriftstore_integration_tests::TestApp;

/// Keys whose values differ between two JSON objects.
fn changed_keys(before: &Value, after: &Value) -> Vec<String> {
    let (Some(before), Some(after)) = (before.as_object(), after.as_object()) else {
        panic!("expected JSON objects");
    };
    before
        .iter()
        .filter(|(key, value)| after.get(key.as_str()) != Some(value))
        .map(|(key, _)| key.clone())
        .collect()
}

async fn admin() -> TestApp {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    app
}

#[tokio::test]
async fn test_deleting_parent_category_is_rejected_and_list_unchanged() {
    let mut app = admin().await;

    let parent = app.post("/api/admin/categories", json!({ "name": "Women" })).await;
    assert_eq!(parent.status, StatusCode::CREATED);
    let parent_id = parent.json()["id"].as_i64().unwrap();
    let child = app
        .post(
            "/api/admin/categories",
            json!({ "name": "Dresses", "parent_id": parent_id }),
        )
        .await;
    assert_eq!(child.status, StatusCode::CREATED);

    let before = app.get("/api/admin/categories").await.json();
    let response = app.delete(&format!("/api/admin/categories/{parent_id}")).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response.json()["error"].as_str().unwrap().contains("sub-categories"));

    let after = app.get("/api/admin/categories").await.json();
    assert_eq!(before, after);
    assert_eq!(after.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_deleting_leaf_category_succeeds() {
    let mut app = admin().await;
    let category = app.post("/api/admin/categories", json!({ "name": "Home" })).await;
    let id = category.json()["id"].as_i64().unwrap();

    let response = app.delete(&format!("/api/admin/categories/{id}")).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let listed = app.get("/api/admin/categories").await.json();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_toggling_category_featured_changes_one_field_on_one_record() {
    let mut app = admin().await;
    for name in ["Women", "Men", "Kids"] {
        app.post("/api/admin/categories", json!({ "name": name })).await;
    }
    let before = app.get("/api/admin/categories").await.json();
    let target = before[1]["id"].as_i64().unwrap();

    let response = app
        .post(&format!("/api/admin/categories/{target}/featured"), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let after = app.get("/api/admin/categories").await.json();
    let before = before.as_array().unwrap();
    let after = after.as_array().unwrap();
    assert_eq!(before.len(), after.len());
    for (old, new) in before.iter().zip(after) {
        if old["id"].as_i64() == Some(target) {
            assert_eq!(changed_keys(old, new), vec!["featured".to_string()]);
            assert_ne!(old["featured"], new["featured"]);
        } else {
            assert_eq!(old, new);
        }
    }
}

#[tokio::test]
async fn test_toggling_product_featured_changes_one_field_on_one_record() {
    let mut app = admin().await;
    app.product("Wool Coat", 2200).await;
    let scarf = app.product("Silk Scarf", 400).await;
    app.product("Leather Belt", 350).await;

    let before = app.get("/api/admin/products").await.json();
    let response = app
        .post(&format!("/api/admin/products/{}/featured", scarf.id), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let after = app.get("/api/admin/products").await.json();

    let mut changed = 0;
    for (old, new) in before.as_array().unwrap().iter().zip(after.as_array().unwrap()) {
        let keys = changed_keys(old, new);
        if old["id"].as_i64() == Some(i64::from(scarf.id.as_i32())) {
            assert_eq!(keys, vec!["featured".to_string()]);
            changed += 1;
        } else {
            assert!(keys.is_empty());
        }
    }
    assert_eq!(changed, 1);
}

#[tokio::test]
async fn test_product_validation_reports_each_field() {
    let mut app = admin().await;
    let response = app
        .post(
            "/api/admin/products",
            json!({ "name": " ", "price": "0", "condition": "good" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json();
    assert!(body["fields"]["name"].is_string());
    assert!(body["fields"]["price"].is_string());
}

#[tokio::test]
async fn test_catalog_requires_permission() {
    let mut app = TestApp::new();
    let response = app.get("/api/admin/categories").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    app.sign_in_as("rider@example.com", UserRole::DeliveryStaff).await;
    let response = app
        .post("/api/admin/categories", json!({ "name": "Women" }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_customers_cannot_reach_back_office() {
    let mut app = TestApp::new();
    let response = app
        .post(
            "/api/auth/register",
            json!({
                "name": "Achieng Odhiambo",
                "email": "achieng@example.com",
                "password": "a long enough password"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = app.get("/api/admin/products").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
