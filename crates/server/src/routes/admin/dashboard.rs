//! Dashboard figures.

use axum::{Json, Router, extract::State, routing::get};

use crate::error::AppError;
use crate::middleware::{RequireStaff, ensure};
use crate::models::Permission;
use crate::services::OrderService;
use crate::services::orders::DashboardSummary;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

async fn dashboard(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, AppError> {
    ensure(&user, Permission::ViewDashboard)?;
    let summary = OrderService::from_state(&state).dashboard_summary().await?;
    Ok(Json(summary))
}
