//! Order management and delivery assignment.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use thriftstore_core::{OrderId, OrderStatus, PaymentStatus, UserId};

use crate::error::AppError;
use crate::middleware::{RequireStaff, ensure};
use crate::models::{CheckoutRequest, Order, OrderFilter, Permission};
use crate::services::OrderService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(show_order))
        .route("/orders/{id}/status", post(update_status))
        .route("/orders/{id}/payment", post(update_payment))
        .route("/orders/{id}/delivery", post(assign_delivery))
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct PaymentInput {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignInput {
    pub staff_id: UserId,
    #[serde(default)]
    pub notes: Option<String>,
}

async fn list_orders(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, AppError> {
    ensure(&user, Permission::ViewOrders)?;
    Ok(Json(OrderService::from_state(&state).list_orders(&filter).await?))
}

/// Counter sale or phone order entered by staff. Items come from the body.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
async fn create_order(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    ensure(&user, Permission::UpdateOrders)?;
    let order = OrderService::from_state(&state)
        .place_order(request, None)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn show_order(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    ensure(&user, Permission::ViewOrders)?;
    Ok(Json(OrderService::from_state(&state).get_order(id).await?))
}

#[instrument(skip(state, user, input), fields(user_id = %user.id, status = %input.status))]
async fn update_status(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(input): Json<StatusInput>,
) -> Result<Json<Order>, AppError> {
    ensure(&user, Permission::UpdateOrders)?;
    let order = OrderService::from_state(&state)
        .update_order_status(id, input.status)
        .await?;
    Ok(Json(order))
}

async fn update_payment(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(input): Json<PaymentInput>,
) -> Result<Json<Order>, AppError> {
    ensure(&user, Permission::UpdateOrders)?;
    let order = OrderService::from_state(&state)
        .update_payment_status(id, input.payment_status)
        .await?;
    Ok(Json(order))
}

#[instrument(skip(state, user, input), fields(user_id = %user.id, staff_id = %input.staff_id))]
async fn assign_delivery(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(input): Json<AssignInput>,
) -> Result<Json<Order>, AppError> {
    ensure(&user, Permission::AssignDeliveries)?;
    let order = OrderService::from_state(&state)
        .assign_delivery(id, input.staff_id, input.notes)
        .await?;
    Ok(Json(order))
}
