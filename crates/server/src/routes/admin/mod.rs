//! Back office JSON API, mounted at `/api/admin`.
//!
//! Every handler takes [`RequireStaff`](crate::middleware::RequireStaff)
//! and checks the permission its action needs.

pub mod catalog;
pub mod content;
pub mod dashboard;
pub mod orders;
pub mod settings;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the back office router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(dashboard::router())
        .merge(catalog::router())
        .merge(orders::router())
        .merge(users::router())
        .merge(settings::router())
        .merge(content::router())
}
