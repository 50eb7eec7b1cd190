//! Staff accounts and the role matrix.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use thriftstore_core::{AccountStatus, UserId, UserRole};

use crate::error::AppError;
use crate::middleware::{RequireStaff, ensure};
use crate::models::{Permission, User, UserFilter, UserForm};
use crate::services::UserService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(show_user).delete(delete_user))
        .route("/users/{id}/role", post(update_role))
        .route("/users/{id}/status", post(update_status))
        .route("/roles", get(roles))
}

fn service(state: &AppState) -> UserService<'_> {
    let stores = state.stores();
    UserService::new(stores.users.as_ref(), stores.orders.as_ref())
}

#[derive(Debug, Deserialize)]
pub struct RoleInput {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: AccountStatus,
}

/// One row of the role/permission matrix.
#[derive(Debug, Serialize)]
pub struct RolePermissions {
    pub role: UserRole,
    pub label: &'static str,
    pub permissions: &'static [Permission],
}

async fn list_users(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<User>>, AppError> {
    ensure(&user, Permission::ManageUsers)?;
    Ok(Json(service(&state).list(&filter).await?))
}

async fn show_user(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, AppError> {
    ensure(&user, Permission::ManageUsers)?;
    Ok(Json(service(&state).get(id).await?))
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
async fn create_user(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(form): Json<UserForm>,
) -> Result<(StatusCode, Json<User>), AppError> {
    ensure(&user, Permission::ManageUsers)?;
    let created = service(&state).create_staff(form).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_role(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(input): Json<RoleInput>,
) -> Result<Json<User>, AppError> {
    ensure(&user, Permission::ManageUsers)?;
    Ok(Json(service(&state).update_role(&user, id, input.role).await?))
}

async fn update_status(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(input): Json<StatusInput>,
) -> Result<Json<User>, AppError> {
    ensure(&user, Permission::ManageUsers)?;
    Ok(Json(service(&state).update_status(&user, id, input.status).await?))
}

async fn delete_user(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    ensure(&user, Permission::ManageUsers)?;
    service(&state).delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn roles(RequireStaff(user): RequireStaff) -> Result<Json<Vec<RolePermissions>>, AppError> {
    ensure(&user, Permission::ManageUsers)?;
    let matrix = UserRole::ALL
        .iter()
        .map(|&role| RolePermissions {
            role,
            label: role.label(),
            permissions: Permission::for_role(role),
        })
        .collect();
    Ok(Json(matrix))
}
