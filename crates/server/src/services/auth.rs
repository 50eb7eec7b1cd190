//! Password authentication.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use tracing::instrument;

use thriftstore_core::AccountStatus;

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if the email/password is wrong and
    /// `AppError::Forbidden` if the account is not active.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let (user, password_hash) = self
            .users
            .find_credentials(email.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &password_hash) {
            tracing::info!(user_id = %user.id, "Rejected login with wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if user.status != AccountStatus::Active {
            return Err(AppError::Forbidden(format!("account is {}", user.status)));
        }

        let now = Utc::now();
        self.users.record_login(user.id, now).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(User {
            last_login_at: Some(now),
            ..user
        })
    }
}

/// Password length check, as a message for the `password` field.
#[must_use]
pub fn password_problem(password: &str) -> Option<String> {
    (password.chars().count() < MIN_PASSWORD_LENGTH)
        .then(|| format!("password must be at least {MIN_PASSWORD_LENGTH} characters"))
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AppError::Internal` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored hash.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use thriftstore_core::{Email, UserRole};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewUser;

    async fn store_with_user(status: AccountStatus) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_user(NewUser {
                name: "Achieng".to_owned(),
                email: Email::parse("achieng@shop.co.ke").unwrap(),
                phone: None,
                role: UserRole::OrderPreparer,
                status,
                password_hash: hash_password("correct horse").unwrap(),
            })
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn test_password_problem() {
        assert!(password_problem("short").is_some());
        assert!(password_problem("long enough").is_none());
    }

    #[tokio::test]
    async fn test_login_records_last_login() {
        let store = store_with_user(AccountStatus::Active).await;
        let user = AuthService::new(&store)
            .login(" Achieng@Shop.co.ke ", "correct horse")
            .await
            .unwrap();
        assert!(user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password_and_suspended_accounts() {
        let store = store_with_user(AccountStatus::Active).await;
        let err = AuthService::new(&store)
            .login("achieng@shop.co.ke", "wrong password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let suspended = store_with_user(AccountStatus::Suspended).await;
        let err = AuthService::new(&suspended)
            .login("achieng@shop.co.ke", "correct horse")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
