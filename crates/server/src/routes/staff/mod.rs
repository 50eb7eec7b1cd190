//! Staff tools mounted at `/api/staff`: deliveries, printing and scanning.

pub mod deliveries;
pub mod printing;
pub mod scanning;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(deliveries::router())
        .merge(printing::router())
        .merge(scanning::router())
}
