//! Public storefront: catalog, cart, checkout and order tracking.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;

use thriftstore_integration_tests::{TestApp, checkout_body};

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();

    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.text(), "ok");

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let mut app = TestApp::new();

    let response = app.get("/health").await;
    assert!(response.header("x-request-id").is_some());
    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
}

#[tokio::test]
async fn test_adding_the_same_item_twice_keeps_one_line() {
    let mut app = TestApp::new();
    let coat = app.product("Wool Coat", 2200).await;

    app.post("/api/store/cart/items", json!({ "product_id": coat.id }))
        .await;
    let cart = app
        .post("/api/store/cart/items", json!({ "product_id": coat.id }))
        .await;

    assert_eq!(cart.status, StatusCode::OK);
    let cart = cart.json();
    assert_eq!(cart["item_count"], 1);
    assert_eq!(cart["subtotal_display"], "KSh 2,200.00");
}

#[tokio::test]
async fn test_checkout_places_order_and_empties_cart() {
    let mut app = TestApp::new();
    let coat = app.product("Wool Coat", 2200).await;
    let hat = app.product("Bucket Hat", 300).await;

    for id in [coat.id, hat.id] {
        app.post("/api/store/cart/items", json!({ "product_id": id }))
            .await;
    }
    let response = app.post("/api/store/checkout", checkout_body()).await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    let order = response.json();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);

    let cart = app.get("/api/store/cart").await.json();
    assert_eq!(cart["item_count"], 0);

    // Both items are now held for the order.
    let listed = app.get("/api/store/products").await.json();
    assert_eq!(listed, json!([]));
    let response = app.get(&format!("/api/store/products/{}", coat.id)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_with_empty_cart_is_rejected() {
    let mut app = TestApp::new();

    let response = app.post("/api/store/checkout", checkout_body()).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_reports_invalid_details_per_field() {
    let mut app = TestApp::new();
    let coat = app.product("Wool Coat", 2200).await;
    app.post("/api/store/cart/items", json!({ "product_id": coat.id }))
        .await;

    let mut body = checkout_body();
    body["email"] = json!("nobody");
    body["shipping"]["region"] = json!("Atlantis");
    let response = app.post("/api/store/checkout", body).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = &response.json()["fields"];
    assert!(fields["email"].is_string());
    assert!(fields["region"].is_string());

    let cart = app.get("/api/store/cart").await.json();
    assert_eq!(cart["item_count"], 1);
}

#[tokio::test]
async fn test_track_order_needs_matching_contact() {
    let mut app = TestApp::new();
    let coat = app.product("Wool Coat", 2200).await;
    app.post("/api/store/cart/items", json!({ "product_id": coat.id }))
        .await;
    let order = app.post("/api/store/checkout", checkout_body()).await.json();
    let number = order["order_number"].as_str().unwrap();

    let mut stranger = app.new_session();
    let found = stranger
        .get(&format!(
            "/api/store/track?order_number={number}&contact=wanjiku@example.com"
        ))
        .await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.json()["id"], order["id"]);

    let wrong = stranger
        .get(&format!(
            "/api/store/track?order_number={number}&contact=someone@example.com"
        ))
        .await;
    assert_eq!(wrong.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registered_customer_sees_own_orders() {
    let mut app = TestApp::new();
    let coat = app.product("Wool Coat", 2200).await;

    assert_eq!(
        app.get("/api/store/account/orders").await.status,
        StatusCode::UNAUTHORIZED
    );

    let response = app
        .post(
            "/api/auth/register",
            json!({
                "name": "Wanjiku Kamau",
                "email": "wanjiku@example.com",
                "password": "a long enough password"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    app.post("/api/store/cart/items", json!({ "product_id": coat.id }))
        .await;
    let order = app.post("/api/store/checkout", checkout_body()).await.json();

    let orders = app.get("/api/store/account/orders").await.json();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], order["id"]);
}
