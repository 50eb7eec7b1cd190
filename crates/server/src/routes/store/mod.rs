//! Public storefront API mounted at `/api/store`.
//!
//! Shoppers browse without signing in. The cart lives in the session and
//! resets with it.

pub mod cart;
pub mod catalog;
pub mod orders;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .merge(cart::router())
        .merge(orders::router())
}
