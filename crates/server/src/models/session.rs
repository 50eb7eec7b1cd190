//! Session-stored identity and state.

use serde::{Deserialize, Serialize};

use thriftstore_core::{Email, UserId, UserRole};

use super::user::{Permission, User};

/// Minimal identity stored in the session for a signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        permission.granted_to(self.role)
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in user.
    pub const CURRENT_USER: &str = "current_user";
    /// Storefront cart contents.
    pub const CART: &str = "cart";
    /// Barcode scanner workflow state.
    pub const SCAN_STATE: &str = "scan_state";
}
