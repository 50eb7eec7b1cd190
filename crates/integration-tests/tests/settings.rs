//! Store settings and storefront content managed from the back office.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;

use thriftstore_core::UserRole;
use thriftstore_integration_tests::{TestApp, checkout_body};

async fn admin() -> TestApp {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    app
}

#[tokio::test]
async fn test_new_shipping_zone_opens_checkout_to_its_regions() {
    let mut app = admin().await;
    let coat = app.product("Wool Coat", 2200).await;
    let mut shopper = app.new_session();
    shopper
        .post("/api/store/cart/items", json!({ "product_id": coat.id }))
        .await;
    let mut body = checkout_body();
    body["shipping"]["region"] = json!("Kakamega");

    let refused = shopper.post("/api/store/checkout", body.clone()).await;
    assert_eq!(refused.status, StatusCode::UNPROCESSABLE_ENTITY);

    let zone = app
        .post(
            "/api/admin/settings/shipping-zones",
            json!({ "name": "Western", "regions": ["Kakamega", "Bungoma"], "base_fee": "500" }),
        )
        .await;
    assert_eq!(zone.status, StatusCode::CREATED, "{}", zone.text());

    let placed = shopper.post("/api/store/checkout", body).await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());
    assert_eq!(placed.json()["shipping_fee"], "500");
}

#[tokio::test]
async fn test_overlapping_zone_regions_are_rejected() {
    let mut app = admin().await;

    let response = app
        .post(
            "/api/admin/settings/shipping-zones",
            json!({ "name": "City", "regions": ["nairobi"], "base_fee": "100" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json()["fields"]["regions"].is_string());
}

#[tokio::test]
async fn test_last_enabled_payment_method_stays_enabled() {
    let mut app = admin().await;

    let response = app
        .put(
            "/api/admin/settings/payment-methods/cash_on_delivery",
            json!({ "enabled": false }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .put("/api/admin/settings/payment-methods/mpesa", json!({ "enabled": false }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settings_need_manage_settings() {
    let mut app = TestApp::new();
    app.sign_in_as("manager@example.com", UserRole::ProductManager)
        .await;

    assert_eq!(
        app.get("/api/admin/settings/shipping-zones").await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_published_help_article_is_rendered_on_storefront() {
    let mut app = admin().await;

    let draft = app
        .post(
            "/api/admin/help",
            json!({ "title": "Draft policy", "body_markdown": "Not yet." }),
        )
        .await;
    assert_eq!(draft.status, StatusCode::CREATED);
    let published = app
        .post(
            "/api/admin/help",
            json!({
                "title": "How do returns work?",
                "category": "Orders",
                "body_markdown": "Returns are accepted within **7 days**.",
                "published": true
            }),
        )
        .await;
    assert_eq!(published.status, StatusCode::CREATED);

    let mut shopper = app.new_session();
    let listed = shopper.get("/api/store/help").await.json();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["slug"], "how-do-returns-work");

    let article = shopper.get("/api/store/help/how-do-returns-work").await;
    assert_eq!(article.status, StatusCode::OK);
    assert!(
        article.json()["body_html"]
            .as_str()
            .unwrap()
            .contains("<strong>7 days</strong>")
    );

    let hidden = shopper.get("/api/store/help/draft-policy").await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_running_campaign_is_promoted() {
    let mut app = admin().await;

    let running = app
        .post(
            "/api/admin/campaigns",
            json!({
                "name": "Rainy season sale",
                "channel": "banner",
                "discount_code": "rain-20",
                "discount_percent": 20,
                "message": "20% off jackets",
                "starts_at": "2020-01-01T00:00:00Z",
                "ends_at": "2099-01-01T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(running.status, StatusCode::CREATED, "{}", running.text());
    assert_eq!(running.json()["discount_code"], "RAIN-20");

    app.post(
        "/api/admin/campaigns",
        json!({
            "name": "Old sale",
            "channel": "banner",
            "starts_at": "2020-01-01T00:00:00Z",
            "ends_at": "2020-02-01T00:00:00Z"
        }),
    )
    .await;

    let promotions = app.new_session().get("/api/store/promotions").await.json();
    let promotions = promotions.as_array().unwrap();
    assert_eq!(promotions.len(), 1);
    assert_eq!(promotions[0]["name"], "Rainy season sale");
}

#[tokio::test]
async fn test_test_notification_is_logged() {
    let mut app = admin().await;

    let response = app
        .post(
            "/api/admin/notifications/test",
            json!({ "channel": "email", "recipient": "owner@example.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());

    let log = app.get("/api/admin/notifications").await.json();
    let log = log.as_array().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0]["recipient"], "owner@example.com");
}
