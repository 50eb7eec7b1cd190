//! Order tracking and a customer's order history.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::Order;
use crate::services::OrderService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/track", get(track_order))
        .route("/account/orders", get(account_orders))
}

/// Order number plus the email or phone used at checkout.
#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub order_number: String,
    pub contact: String,
}

async fn track_order(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
) -> Result<Json<Order>, AppError> {
    let order = OrderService::from_state(&state)
        .track_order(&query.order_number, &query.contact)
        .await?;
    Ok(Json(order))
}

async fn account_orders(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = OrderService::from_state(&state)
        .account_orders(user.id)
        .await?;
    Ok(Json(orders))
}
