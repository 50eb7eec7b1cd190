//! Staff account management.
//!
//! Accounts are created through the same validation as the back office, so
//! the first admin can be bootstrapped before anyone can sign in.

use thriftstore_core::UserRole;
use thriftstore_server::db::Stores;
use thriftstore_server::error::AppError;
use thriftstore_server::models::UserForm;
use thriftstore_server::services::UserService;

use super::{ConnectError, connect};

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid role: {0}. Valid roles: admin, product_manager, order_preparer, delivery_staff")]
    InvalidRole(String),

    #[error("{0}")]
    Rejected(#[from] AppError),
}

/// Create a staff account and return its ID.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: String,
) -> Result<i32, StaffError> {
    let role: UserRole = role
        .parse()
        .ok()
        .filter(UserRole::is_staff)
        .ok_or_else(|| StaffError::InvalidRole(role.to_owned()))?;

    let stores = Stores::postgres(connect().await?);
    let user = UserService::new(stores.users.as_ref(), stores.orders.as_ref())
        .create_staff(UserForm {
            name: name.to_owned(),
            email: email.to_owned(),
            phone: None,
            password,
            role,
        })
        .await?;

    tracing::info!(
        "Staff account created! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email.as_str(),
        user.role
    );
    Ok(user.id.as_i32())
}
