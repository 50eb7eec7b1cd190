//! Barcode scanner workflow.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;

use thriftstore_core::UserRole;
use thriftstore_integration_tests::TestApp;

async fn scanner() -> TestApp {
    let mut app = TestApp::new();
    app.sign_in_as("prep@example.com", UserRole::OrderPreparer).await;
    app
}

#[tokio::test]
async fn test_cancel_leaves_history_untouched() {
    let mut app = scanner().await;
    assert_eq!(app.get("/api/staff/scan").await.json()["state"], "idle");

    let started = app
        .post("/api/staff/scan/start", json!({ "camera_granted": true }))
        .await;
    assert_eq!(started.status, StatusCode::OK);
    assert_eq!(started.json()["state"], "scanning");
    assert_eq!(app.get("/api/staff/scan").await.json()["state"], "scanning");

    let cancelled = app.post("/api/staff/scan/cancel", json!({})).await;
    assert_eq!(cancelled.json()["state"], "idle");

    let history = app.get("/api/staff/scan/history").await.json();
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_start_without_camera_stays_idle() {
    let mut app = scanner().await;

    let response = app
        .post("/api/staff/scan/start", json!({ "camera_granted": false }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.get("/api/staff/scan").await.json()["state"], "idle");
}

#[tokio::test]
async fn test_complete_requires_a_started_scan() {
    let mut app = scanner().await;

    let response = app
        .post("/api/staff/scan/complete", json!({ "code": "TEST-anything" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scan_matches_product_barcode_and_returns_to_idle() {
    let mut app = scanner().await;
    let product = app.product("Linen Dress", 1200).await;

    app.post("/api/staff/scan/start", json!({ "camera_granted": true }))
        .await;
    let response = app
        .post("/api/staff/scan/complete", json!({ "code": product.barcode }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["product"]["id"], json!(product.id));
    assert_eq!(body["record"]["code"], json!(product.barcode));
    assert_eq!(body["scanner"]["state"], "idle");

    let history = app.get("/api/staff/scan/history").await.json();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_code_is_recorded_without_product() {
    let mut app = scanner().await;

    app.post("/api/staff/scan/start", json!({ "camera_granted": true }))
        .await;
    let body = app
        .post("/api/staff/scan/complete", json!({ "code": "9780000000000" }))
        .await
        .json();

    assert!(body["product"].is_null());
    assert!(body["record"]["product_id"].is_null());
}

#[tokio::test]
async fn test_offline_sync_skips_already_uploaded_scans() {
    let mut app = scanner().await;
    let scans = json!({
        "scans": [
            { "code": "TS-0001", "scanned_at": "2026-03-01T09:00:00Z", "client_ref": "dev1-1" },
            { "code": "TS-0002", "scanned_at": "2026-03-01T09:01:00Z", "client_ref": "dev1-2" },
            { "code": "x", "scanned_at": "2026-03-01T09:02:00Z", "client_ref": "dev1-3" }
        ]
    });

    let first = app.post("/api/staff/scan/sync", scans.clone()).await.json();
    assert_eq!(first["accepted"], 2);
    assert_eq!(first["skipped"], 0);
    assert_eq!(first["rejected"].as_array().unwrap().len(), 1);

    let retry = app.post("/api/staff/scan/sync", scans).await.json();
    assert_eq!(retry["accepted"], 0);
    assert_eq!(retry["skipped"], 2);

    let history = app.get("/api/staff/scan/history").await.json();
    assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_clear_history_only_touches_own_scans() {
    let mut app = scanner().await;
    let mut other = app.new_session();
    other
        .sign_in_as("manager@example.com", UserRole::ProductManager)
        .await;

    for (session, reference) in [(&mut app, "a-1"), (&mut other, "b-1")] {
        session
            .post(
                "/api/staff/scan/sync",
                json!({ "scans": [{ "code": "TS-0001", "scanned_at": "2026-03-01T09:00:00Z", "client_ref": reference }] }),
            )
            .await;
    }

    let cleared = app.delete("/api/staff/scan/history").await.json();
    assert_eq!(cleared["removed"], 1);
    let remaining = other.get("/api/staff/scan/history").await.json();
    assert_eq!(remaining.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_customers_cannot_scan() {
    let mut app = TestApp::new();
    let response = app
        .post(
            "/api/auth/register",
            json!({
                "name": "Achieng",
                "email": "achieng@example.com",
                "password": "a long enough password"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = app
        .post("/api/staff/scan/start", json!({ "camera_granted": true }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
