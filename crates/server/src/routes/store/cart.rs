//! Session cart and checkout.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use thriftstore_core::ProductId;

use crate::error::AppError;
use crate::middleware::{OptionalUser, read_session, write_session};
use crate::models::{Cart, CartView, CheckoutRequest, Order, session_keys};
use crate::services::{CartService, OrderService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(show_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{id}", delete(remove_item))
        .route("/checkout", post(checkout))
}

fn service(state: &AppState) -> CartService<'_> {
    let stores = state.stores();
    CartService::new(stores.catalog.as_ref(), stores.settings.as_ref())
}

#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: ProductId,
}

async fn show_cart(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartView>, AppError> {
    let mut cart: Cart = read_session(&session, session_keys::CART).await?;
    let view = service(&state).view(&mut cart).await?;
    if !view.unavailable.is_empty() {
        write_session(&session, session_keys::CART, &cart).await?;
    }
    Ok(Json(view))
}

async fn add_item(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<AddItemInput>,
) -> Result<Json<CartView>, AppError> {
    let mut cart: Cart = read_session(&session, session_keys::CART).await?;
    let view = service(&state).add_item(&mut cart, input.product_id).await?;
    write_session(&session, session_keys::CART, &cart).await?;
    Ok(Json(view))
}

async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Json<CartView>, AppError> {
    let mut cart: Cart = read_session(&session, session_keys::CART).await?;
    let view = service(&state).remove_item(&mut cart, id).await?;
    write_session(&session, session_keys::CART, &cart).await?;
    Ok(Json(view))
}

async fn clear_cart(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartView>, AppError> {
    let mut cart: Cart = read_session(&session, session_keys::CART).await?;
    let view = service(&state).clear(&mut cart).await?;
    write_session(&session, session_keys::CART, &cart).await?;
    Ok(Json(view))
}

/// Place an order for the cart. Signed-in customers get it on their account.
#[instrument(skip(state, session, user, details))]
async fn checkout(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Json(details): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let mut cart: Cart = read_session(&session, session_keys::CART).await?;
    let orders = OrderService::from_state(&state);
    let order = service(&state)
        .checkout(&mut cart, details, user.map(|u| u.id), &orders)
        .await?;
    write_session(&session, session_keys::CART, &cart).await?;
    Ok((StatusCode::CREATED, Json(order)))
}
