//! User accounts, roles and permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thriftstore_core::{AccountStatus, Email, PhoneNumber, UserId, UserRole};

/// A staff member or registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Option<PhoneNumber>,
    pub role: UserRole,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Validated values for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub phone: Option<PhoneNumber>,
    pub role: UserRole,
    pub status: AccountStatus,
    pub password_hash: String,
}

/// Staff "add user" form, also used for customer sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
}

const fn default_role() -> UserRole {
    UserRole::Customer
}

/// Query parameters for user listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub status: Option<AccountStatus>,
    pub q: Option<String>,
    /// Include customers in the listing (staff only by default).
    #[serde(default)]
    pub include_customers: bool,
}

impl UserFilter {
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        if let Some(role) = self.role {
            if role != user.role {
                return false;
            }
        } else if !self.include_customers && !user.role.is_staff() {
            return false;
        }
        if self.status.is_some_and(|s| s != user.status) {
            return false;
        }
        match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                user.name.to_lowercase().contains(&q) || user.email.as_str().contains(&q)
            }
            _ => true,
        }
    }
}

/// Actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewDashboard,
    ManageCatalog,
    ViewOrders,
    UpdateOrders,
    AssignDeliveries,
    Deliver,
    ManageUsers,
    ManageSettings,
    ManageMarketing,
    ManageContent,
    Print,
    Scan,
}

impl Permission {
    /// Permissions granted to `role`.
    #[must_use]
    pub fn for_role(role: UserRole) -> &'static [Self] {
        use Permission::{
            AssignDeliveries, Deliver, ManageCatalog, ManageContent, ManageMarketing,
            ManageSettings, ManageUsers, Print, Scan, UpdateOrders, ViewDashboard, ViewOrders,
        };
        match role {
            UserRole::Admin => &[
                ViewDashboard,
                ManageCatalog,
                ViewOrders,
                UpdateOrders,
                AssignDeliveries,
                Deliver,
                ManageUsers,
                ManageSettings,
                ManageMarketing,
                ManageContent,
                Print,
                Scan,
            ],
            UserRole::ProductManager => &[ViewDashboard, ManageCatalog, ViewOrders, Print, Scan],
            UserRole::OrderPreparer => &[ViewOrders, UpdateOrders, AssignDeliveries, Print, Scan],
            UserRole::DeliveryStaff => &[Deliver, Scan],
            UserRole::Customer => &[],
        }
    }

    /// Whether `role` holds this permission.
    #[must_use]
    pub fn granted_to(self, role: UserRole) -> bool {
        Self::for_role(role).contains(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_holds_every_permission() {
        for permission in Permission::for_role(UserRole::Admin) {
            assert!(permission.granted_to(UserRole::Admin));
        }
        assert!(Permission::ManageUsers.granted_to(UserRole::Admin));
    }

    #[test]
    fn test_role_boundaries() {
        assert!(Permission::ManageCatalog.granted_to(UserRole::ProductManager));
        assert!(!Permission::ManageSettings.granted_to(UserRole::ProductManager));
        assert!(Permission::Deliver.granted_to(UserRole::DeliveryStaff));
        assert!(!Permission::ViewOrders.granted_to(UserRole::DeliveryStaff));
        assert!(Permission::for_role(UserRole::Customer).is_empty());
    }
}
