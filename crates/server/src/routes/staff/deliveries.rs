//! Delivery staff workflow.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use thriftstore_core::{DeliveryStatus, OrderId};

use crate::error::AppError;
use crate::middleware::{RequireStaff, ensure};
use crate::models::{Order, Permission};
use crate::services::DeliveryService;
use crate::services::deliveries::DeliveryView;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/deliveries", get(list_deliveries))
        .route("/deliveries/{id}/start", post(start_delivery))
        .route("/deliveries/{id}/complete", post(complete_delivery))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveryQuery {
    pub status: Option<DeliveryStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteInput {
    #[serde(default)]
    pub notes: Option<String>,
}

async fn list_deliveries(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<DeliveryQuery>,
) -> Result<Json<Vec<DeliveryView>>, AppError> {
    ensure(&user, Permission::Deliver)?;
    let deliveries = DeliveryService::from_state(&state)
        .list_assigned(&user, query.status)
        .await?;
    Ok(Json(deliveries))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn start_delivery(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    ensure(&user, Permission::Deliver)?;
    let order = DeliveryService::from_state(&state)
        .start_delivery(&user, id)
        .await?;
    Ok(Json(order))
}

#[instrument(skip(state, user, input), fields(user_id = %user.id))]
async fn complete_delivery(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(input): Json<CompleteInput>,
) -> Result<Json<Order>, AppError> {
    ensure(&user, Permission::Deliver)?;
    let order = DeliveryService::from_state(&state)
        .complete_delivery(&user, id, input.notes)
        .await?;
    Ok(Json(order))
}
