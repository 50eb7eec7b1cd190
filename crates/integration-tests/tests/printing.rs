//! Printer status, print jobs and document downloads.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use thriftstore_core::UserRole;
use thriftstore_integration_tests::{TestApp, checkout_body};

/// Sign in as an admin and place one staff order. Returns the order JSON.
async fn app_with_order() -> (TestApp, Value) {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    let coat = app.product("Wool Coat", 2200).await;

    let mut body = checkout_body();
    body["items"] = json!([coat.id]);
    let response = app.post("/api/admin/orders", body).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    let order = response.json();
    (app, order)
}

#[tokio::test]
async fn test_shipping_label_shows_each_detail_once() {
    let (mut app, order) = app_with_order().await;
    let order_number = order["order_number"].as_str().unwrap();

    let response = app
        .get(&format!(
            "/api/staff/orders/{}/documents/shipping_label",
            order["id"]
        ))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.header("content-disposition"),
        Some(format!("attachment; filename=\"shipping-label-{order_number}.html\"").as_str())
    );
    let html = response.text();
    assert_eq!(html.matches(order_number).count(), 1);
    assert_eq!(html.matches("Wanjiku Kamau").count(), 1);
    assert_eq!(
        html.matches("12 Moi Avenue, Nairobi, Nairobi 00100").count(),
        1
    );
}

#[tokio::test]
async fn test_pdf_output_returns_one_attachment() {
    let (mut app, order) = app_with_order().await;

    let response = app
        .post(
            "/api/staff/print",
            json!({ "document": "receipt", "target_id": order["id"], "output": "pdf" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers.get_all("content-disposition").iter().count(), 1);
    assert!(response.header("x-print-job-id").is_some());
    assert!(response.header("x-print-fallback").is_none());
    assert!(response.text().contains("Wool Coat"));

    let jobs = app.get("/api/staff/print-jobs").await.json();
    let jobs = jobs.as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["status"], "completed");
}

#[tokio::test]
async fn test_printer_output_without_printer_falls_back_to_download() {
    let (mut app, order) = app_with_order().await;

    let status = app.get("/api/staff/printer").await.json();
    assert_eq!(status["online"], false);

    let response = app
        .post(
            "/api/staff/print",
            json!({ "document": "shipping_label", "target_id": order["id"], "output": "printer" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-print-fallback"), Some("pdf"));
    assert!(
        response
            .header("content-disposition")
            .unwrap()
            .starts_with("attachment;")
    );

    let jobs = app.get("/api/staff/print-jobs").await.json();
    assert_eq!(jobs[0]["status"], "failed");
    assert!(jobs[0]["error"].is_string());
}

#[tokio::test]
async fn test_invalid_copies_and_missing_targets() {
    let (mut app, order) = app_with_order().await;

    let response = app
        .post(
            "/api/staff/print",
            json!({ "document": "receipt", "target_id": order["id"], "output": "pdf", "copies": 0 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json()["fields"]["copies"].is_string());

    let response = app.get("/api/staff/orders/9999/documents/receipt").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .get(&format!(
            "/api/staff/orders/{}/documents/product_label",
            order["id"]
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_label_carries_barcode_and_price() {
    let mut app = TestApp::new();
    app.sign_in_as("manager@example.com", UserRole::ProductManager)
        .await;
    let jacket = app.product("Denim Jacket", 1500).await;

    let response = app
        .get(&format!("/api/staff/products/{}/label", jacket.id))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let html = response.text();
    assert!(html.contains(&jacket.barcode));
    assert!(html.contains("1,500.00"));
}
