//! Authentication extractors.
//!
//! Handlers take [`RequireUser`] (any signed-in account), [`RequireStaff`]
//! (back office roles) or [`OptionalUser`], then check finer permissions
//! with [`ensure`].
//!
//! The session only remembers who signed in. Role and account status are
//! reloaded from the user store on every request, so suspending, demoting
//! or deleting an account takes effect on that user's next request.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;

use thriftstore_core::AccountStatus;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, Permission, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireUser(user): RequireUser) -> Json<CurrentUser> {
///     Json(user)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let user = current_user(parts, &state)
            .await?
            .ok_or_else(|| AppError::Unauthorized("sign in to continue".to_string()))?;
        set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
        Ok(Self(user))
    }
}

/// Extractor that requires a staff account (any role but customer).
pub struct RequireStaff(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireStaff
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.role.is_staff() {
            return Err(AppError::Forbidden(
                "staff access only".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Self(current_user(parts, &state).await?))
    }
}

/// The signed-in user as currently stored.
///
/// A session whose account was deleted or is no longer active is signed
/// out and treated as anonymous.
async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    let Some(cached) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let stored = state.stores().users.get_user(cached.id).await?;
    match stored {
        Some(user) if user.status == AccountStatus::Active => {
            let fresh = CurrentUser::from(&user);
            if fresh.role != cached.role {
                tracing::info!(
                    user_id = %user.id,
                    from = %cached.role,
                    to = %user.role,
                    "Session role refreshed"
                );
            }
            Ok(Some(fresh))
        }
        stored => {
            tracing::info!(
                user_id = %cached.id,
                status = ?stored.map(|u| u.status),
                "Signing out session of unavailable account"
            );
            session
                .remove::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
            Ok(None)
        }
    }
}

/// Require `permission` for `user`.
///
/// # Errors
///
/// Returns `AppError::Forbidden` naming the missing permission.
pub fn ensure(user: &CurrentUser, permission: Permission) -> Result<(), AppError> {
    if user.can(permission) {
        Ok(())
    } else {
        tracing::info!(user_id = %user.id, role = %user.role, ?permission, "Permission denied");
        Err(AppError::Forbidden(format!(
            "your role ({}) cannot do this",
            user.role
        )))
    }
}

/// Sign `user` in, rotating the session ID.
pub async fn set_current_user(session: &Session, user: &CurrentUser) -> Result<(), AppError> {
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    session
        .insert(session_keys::CURRENT_USER, user)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))
}

/// Sign out by discarding the whole session (cart and scanner state too).
pub async fn clear_current_user(session: &Session) -> Result<(), AppError> {
    clear_sentry_user();
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))
}
