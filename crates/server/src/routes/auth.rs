//! Sign-in, sign-out and customer registration.

use axum::{Json, Router, extract::State, http::StatusCode, routing::{get, post}};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, set_sentry_user};
use crate::middleware::{RequireUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Permission, User, UserForm};
use crate::services::{AuthService, UserService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/register", post(register))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in user with what their role allows.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: CurrentUser,
    pub permissions: &'static [Permission],
}

impl From<CurrentUser> for MeResponse {
    fn from(user: CurrentUser) -> Self {
        let permissions = Permission::for_role(user.role);
        Self { user, permissions }
    }
}

#[instrument(skip(state, session, body), fields(email = %body.email))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<MeResponse>, AppError> {
    let user = AuthService::new(state.stores().users.as_ref())
        .login(&body.email, &body.password)
        .await?;
    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;
    set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
    Ok(Json(current.into()))
}

async fn logout(session: Session) -> Result<StatusCode, AppError> {
    clear_current_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(RequireUser(user): RequireUser) -> Json<MeResponse> {
    Json(user.into())
}

/// Storefront sign-up. The new customer is signed in straight away.
#[instrument(skip(state, session, form))]
async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<UserForm>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let stores = state.stores();
    let user = UserService::new(stores.users.as_ref(), stores.orders.as_ref())
        .register_customer(form)
        .await?;
    set_current_user(&session, &CurrentUser::from(&user)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
