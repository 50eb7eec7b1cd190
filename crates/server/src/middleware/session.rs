//! Session configuration and typed access.
//!
//! Sessions hold the signed-in user, the storefront cart and the scanner
//! state. Production uses `PostgresStore` (table `tower_sessions.session`);
//! tests use the in-memory store.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use crate::config::ServerConfig;
use crate::error::AppError;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "thriftstore_session";

/// Session expiry after inactivity (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Create the session layer over `store`.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &ServerConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Read `key`, falling back to the type's default when absent.
pub async fn read_session<T>(session: &Session, key: &str) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    session
        .get::<T>(key)
        .await
        .map(Option::unwrap_or_default)
        .map_err(|e| AppError::Internal(format!("session read failed: {e}")))
}

pub async fn write_session<T>(session: &Session, key: &str, value: &T) -> Result<(), AppError>
where
    T: Serialize + Send + Sync,
{
    session
        .insert(key, value)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))
}
