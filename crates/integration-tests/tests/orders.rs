//! Order lifecycle from placement to delivery.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use thriftstore_core::UserRole;
use thriftstore_integration_tests::{TEST_PASSWORD, TestApp, checkout_body};

async fn place_order(app: &mut TestApp, product_id: Value) -> Value {
    let mut body = checkout_body();
    body["items"] = json!([product_id]);
    let response = app.post("/api/admin/orders", body).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    response.json()
}

async fn set_status(app: &mut TestApp, order: &Value, status: &str) -> StatusCode {
    app.post(
        &format!("/api/admin/orders/{}/status", order["id"]),
        json!({ "status": status }),
    )
    .await
    .status
}

#[tokio::test]
async fn test_orders_only_move_one_step_forward() {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    let coat = app.product("Wool Coat", 2200).await;
    let order = place_order(&mut app, json!(coat.id)).await;

    assert_eq!(set_status(&mut app, &order, "ready").await, StatusCode::BAD_REQUEST);
    assert_eq!(set_status(&mut app, &order, "processing").await, StatusCode::OK);
    assert_eq!(set_status(&mut app, &order, "pending").await, StatusCode::BAD_REQUEST);

    let shown = app.get(&format!("/api/admin/orders/{}", order["id"])).await.json();
    assert_eq!(shown["status"], "processing");
}

#[tokio::test]
async fn test_cancelling_puts_items_back_on_sale() {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    let coat = app.product("Wool Coat", 2200).await;
    let order = place_order(&mut app, json!(coat.id)).await;

    let product = app.get(&format!("/api/admin/products/{}", coat.id)).await.json();
    assert_eq!(product["status"], "reserved");

    assert_eq!(set_status(&mut app, &order, "cancelled").await, StatusCode::OK);
    let product = app.get(&format!("/api/admin/products/{}", coat.id)).await.json();
    assert_eq!(product["status"], "active");

    assert_eq!(set_status(&mut app, &order, "processing").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_products_on_open_orders_cannot_be_deleted() {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    let coat = app.product("Wool Coat", 2200).await;
    let scarf = app.product("Silk Scarf", 600).await;
    let coat_order = place_order(&mut app, json!(coat.id)).await;
    let scarf_order = place_order(&mut app, json!(scarf.id)).await;
    let coat_uri = format!("/api/admin/products/{}", coat.id);
    let scarf_uri = format!("/api/admin/products/{}", scarf.id);

    assert_eq!(app.delete(&coat_uri).await.status, StatusCode::CONFLICT);
    assert_eq!(app.delete(&scarf_uri).await.status, StatusCode::CONFLICT);
    assert_eq!(app.get(&coat_uri).await.status, StatusCode::OK);

    assert_eq!(set_status(&mut app, &coat_order, "cancelled").await, StatusCode::OK);
    assert_eq!(app.delete(&coat_uri).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&coat_uri).await.status, StatusCode::NOT_FOUND);

    for status in ["processing", "ready", "out_for_delivery", "delivered"] {
        assert_eq!(set_status(&mut app, &scarf_order, status).await, StatusCode::OK);
    }
    assert_eq!(app.delete(&scarf_uri).await.status, StatusCode::NO_CONTENT);
    let order = app
        .get(&format!("/api/admin/orders/{}", scarf_order["id"]))
        .await
        .json();
    assert_eq!(order["items"][0]["name"], "Silk Scarf");
}

#[tokio::test]
async fn test_reserved_product_status_is_held_by_its_order() {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    let coat = app.product("Wool Coat", 2200).await;
    let order = place_order(&mut app, json!(coat.id)).await;
    let status_uri = format!("/api/admin/products/{}/status", coat.id);

    let response = app.post(&status_uri, json!({ "status": "active" })).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    let product = app.get(&format!("/api/admin/products/{}", coat.id)).await.json();
    assert_eq!(product["status"], "reserved");
    let listed = app.get("/api/store/products").await.json();
    assert!(!listed.to_string().contains("Wool Coat"));

    assert_eq!(set_status(&mut app, &order, "cancelled").await, StatusCode::OK);
    let response = app.post(&status_uri, json!({ "status": "archived" })).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    assert_eq!(response.json()["status"], "archived");
}

#[tokio::test]
async fn test_assigned_delivery_is_completed_by_its_rider() {
    let mut app = TestApp::new();
    app.sign_in_as("admin@example.com", UserRole::Admin).await;
    let rider = app.staff("rider@example.com", UserRole::DeliveryStaff).await;
    app.staff("other@example.com", UserRole::DeliveryStaff).await;
    let coat = app.product("Wool Coat", 2200).await;
    let order = place_order(&mut app, json!(coat.id)).await;
    let delivery_uri = format!("/api/admin/orders/{}/delivery", order["id"]);

    // Only ready orders can be handed to a rider.
    let early = app.post(&delivery_uri, json!({ "staff_id": rider.id })).await;
    assert_eq!(early.status, StatusCode::BAD_REQUEST);

    set_status(&mut app, &order, "processing").await;
    set_status(&mut app, &order, "ready").await;
    let assigned = app.post(&delivery_uri, json!({ "staff_id": rider.id })).await;
    assert_eq!(assigned.status, StatusCode::OK, "{}", assigned.text());
    assert_eq!(assigned.json()["delivery"]["status"], "assigned");

    let mut other = app.new_session();
    other
        .post(
            "/api/auth/login",
            json!({ "email": "other@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(other.get("/api/staff/deliveries").await.json(), json!([]));
    let response = other
        .post(&format!("/api/staff/deliveries/{}/start", order["id"]), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let mut rider_session = app.new_session();
    rider_session
        .post(
            "/api/auth/login",
            json!({ "email": "rider@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    let deliveries = rider_session.get("/api/staff/deliveries").await.json();
    let deliveries = deliveries.as_array().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert!(
        deliveries[0]["map_link"]
            .as_str()
            .unwrap()
            .starts_with("https://www.google.com/maps/search/")
    );

    let started = rider_session
        .post(&format!("/api/staff/deliveries/{}/start", order["id"]), json!({}))
        .await;
    assert_eq!(started.status, StatusCode::OK);
    assert_eq!(started.json()["status"], "out_for_delivery");

    let completed = rider_session
        .post(
            &format!("/api/staff/deliveries/{}/complete", order["id"]),
            json!({ "notes": "Left with the guard" }),
        )
        .await;
    assert_eq!(completed.status, StatusCode::OK);
    let completed = completed.json();
    assert_eq!(completed["status"], "delivered");
    assert_eq!(completed["delivery"]["status"], "completed");

    let product = app.get(&format!("/api/admin/products/{}", coat.id)).await.json();
    assert_eq!(product["status"], "sold");

    // Delivery history keeps the rider's account; riders without it can go.
    let response = app.delete(&format!("/api/admin/users/{}", rider.id)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    let users = app.get("/api/admin/users?role=delivery_staff").await.json();
    assert_eq!(users.as_array().unwrap().len(), 2);
    let other_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "other@example.com")
        .unwrap()["id"]
        .clone();
    let response = app.delete(&format!("/api/admin/users/{other_id}")).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_delivery_staff_cannot_see_order_list() {
    let mut app = TestApp::new();
    app.sign_in_as("rider@example.com", UserRole::DeliveryStaff)
        .await;

    assert_eq!(
        app.get("/api/admin/orders").await.status,
        StatusCode::FORBIDDEN
    );
}
