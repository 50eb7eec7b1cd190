//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (database ping)
//!
//! # Auth
//! POST /api/auth/login                      - Sign in with email and password
//! POST /api/auth/logout                     - Sign out
//! GET  /api/auth/me                         - Current user and permissions
//! POST /api/auth/register                   - Customer sign-up
//!
//! # Back office (/api/admin)
//! GET  /dashboard
//! GET|POST /categories, GET|PUT|DELETE /categories/{id}, POST /categories/{id}/featured
//! GET|POST /products, GET|PATCH|DELETE /products/{id}, POST /products/{id}/status,
//!   POST /products/{id}/featured, POST /products/{id}/images, DELETE /products/{id}/images/{index}
//! GET|POST /orders, GET /orders/{id}, POST /orders/{id}/status, POST /orders/{id}/payment,
//!   POST /orders/{id}/delivery
//! GET|POST /users, GET|DELETE /users/{id}, POST /users/{id}/role, POST /users/{id}/status
//! GET  /roles
//! /settings/shipping-zones, /settings/tax-categories, /settings/payment-methods,
//!   /settings/notifications, /settings/store
//! GET|POST /campaigns, GET|PUT|DELETE /campaigns/{id}
//! GET|POST /help, GET|PUT|DELETE /help/{id}
//! GET  /notifications, POST /notifications/test
//!
//! # Staff tools (/api/staff)
//! GET  /deliveries, POST /deliveries/{id}/start, POST /deliveries/{id}/complete
//! GET  /printer, POST /print, GET /print-jobs
//! GET  /orders/{id}/documents/{kind}, GET /products/{id}/label
//! GET  /scan, POST /scan/start, /scan/cancel, /scan/complete, /scan/sync
//! GET|DELETE /scan/history
//!
//! # Storefront (/api/store)
//! GET  /products, GET /products/{id}, GET /categories
//! GET|DELETE /cart, POST /cart/items, DELETE /cart/items/{id}
//! POST /checkout, GET /track, GET /account/orders
//! GET  /help, GET /help/{slug}
//! ```

pub mod admin;
pub mod auth;
pub mod health;
pub mod staff;
pub mod store;

use axum::Router;
use serde::Deserialize;

use crate::state::AppState;

/// Build the complete application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/auth", auth::router())
        .nest("/api/admin", admin::router())
        .nest("/api/staff", staff::router())
        .nest("/api/store", store::router())
}

/// `?q=` search on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}
