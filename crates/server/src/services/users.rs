//! Staff and customer account management.

use tracing::instrument;

use thriftstore_core::{AccountStatus, Email, PhoneNumber, UserId, UserRole};

use super::auth::{hash_password, password_problem};
use crate::db::{OrderStore, RepositoryError, UserStore};
use crate::error::{AppError, FieldErrors};
use crate::models::{CurrentUser, NewUser, User, UserFilter, UserForm};

pub struct UserService<'a> {
    users: &'a dyn UserStore,
    orders: &'a dyn OrderStore,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, orders: &'a dyn OrderStore) -> Self {
        Self { users, orders }
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, AppError> {
        let users = self.users.list_users().await?;
        Ok(users.into_iter().filter(|u| filter.matches(u)).collect())
    }

    pub async fn get(&self, id: UserId) -> Result<User, AppError> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {id}")))
    }

    /// Create a staff account from the admin form.
    ///
    /// Every invalid field is reported at once as a 422.
    #[instrument(skip(self, form), fields(email = %form.email, role = %form.role))]
    pub async fn create_staff(&self, form: UserForm) -> Result<User, AppError> {
        let mut errors = FieldErrors::new();
        if form.role == UserRole::Customer {
            errors.add("role", "choose a staff role");
        }
        let role = form.role;
        self.create(form, role, errors).await
    }

    /// Storefront sign-up; always creates a customer.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register_customer(&self, form: UserForm) -> Result<User, AppError> {
        self.create(form, UserRole::Customer, FieldErrors::new())
            .await
    }

    async fn create(
        &self,
        form: UserForm,
        role: UserRole,
        mut errors: FieldErrors,
    ) -> Result<User, AppError> {
        let name = form.name.trim().to_owned();
        if name.is_empty() {
            errors.add("name", "name is required");
        }
        let email = match Email::parse(&form.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.add("email", e.to_string());
                None
            }
        };
        let phone = match super::non_blank(form.phone.as_deref()).map(|p| PhoneNumber::parse(&p)) {
            Some(Ok(phone)) => Some(phone),
            Some(Err(e)) => {
                errors.add("phone", e.to_string());
                None
            }
            None => None,
        };
        if let Some(problem) = password_problem(&form.password) {
            errors.add("password", problem);
        }

        let email = match email {
            Some(email) if errors.is_empty() => email,
            _ => return Err(AppError::Validation(errors)),
        };

        let user = self
            .users
            .insert_user(NewUser {
                name,
                email,
                phone,
                role,
                status: AccountStatus::Active,
                password_hash: hash_password(&form.password)?,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    AppError::field("email", "an account with this email already exists")
                }
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "Account created");
        Ok(user)
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn update_role(
        &self,
        actor: &CurrentUser,
        id: UserId,
        role: UserRole,
    ) -> Result<User, AppError> {
        if actor.id == id && role != actor.role {
            return Err(AppError::BadRequest(
                "you cannot change your own role".to_string(),
            ));
        }
        let mut user = self.get(id).await?;
        user.role = role;
        self.users.update_user(&user).await?;
        Ok(user)
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn update_status(
        &self,
        actor: &CurrentUser,
        id: UserId,
        status: AccountStatus,
    ) -> Result<User, AppError> {
        if actor.id == id && status != AccountStatus::Active {
            return Err(AppError::BadRequest(
                "you cannot deactivate your own account".to_string(),
            ));
        }
        let mut user = self.get(id).await?;
        user.status = status;
        self.users.update_user(&user).await?;
        Ok(user)
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete(&self, actor: &CurrentUser, id: UserId) -> Result<(), AppError> {
        if actor.id == id {
            return Err(AppError::BadRequest(
                "you cannot delete your own account".to_string(),
            ));
        }
        let open_deliveries = self.orders.list_orders().await?.into_iter().any(|order| {
            !order.status.is_terminal() && order.delivery.as_ref().is_some_and(|d| d.staff_id == id)
        });
        if open_deliveries {
            return Err(AppError::Conflict(
                "reassign this staff member's open deliveries first".to_string(),
            ));
        }
        self.users.delete_user(id).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::Conflict(
                "staff with delivery history cannot be deleted; deactivate the account instead"
                    .to_string(),
            ),
            other => other.into(),
        })?;
        tracing::info!(user_id = %id, "Account deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn form(email: &str, role: UserRole) -> UserForm {
        UserForm {
            name: "Otieno".to_owned(),
            email: email.to_owned(),
            phone: Some("0712 345 678".to_owned()),
            password: "long enough".to_owned(),
            role,
        }
    }

    fn actor(user: &User) -> CurrentUser {
        CurrentUser::from(user)
    }

    #[tokio::test]
    async fn test_invalid_email_is_field_error_and_nothing_is_created() {
        let store = MemoryStore::new();
        let service = UserService::new(&store, &store);

        let err = service
            .create_staff(form("not-an-email", UserRole::DeliveryStaff))
            .await
            .unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(fields.get("email").is_some());

        let filter = UserFilter {
            include_customers: true,
            ..UserFilter::default()
        };
        assert!(service.list(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_problems_reported_together() {
        let store = MemoryStore::new();
        let service = UserService::new(&store, &store);
        let bad = UserForm {
            name: " ".to_owned(),
            email: "x@y".to_owned(),
            phone: Some("12".to_owned()),
            password: "short".to_owned(),
            role: UserRole::Customer,
        };
        let AppError::Validation(fields) = service.create_staff(bad).await.unwrap_err() else {
            panic!("expected validation error");
        };
        for field in ["name", "email", "phone", "password", "role"] {
            assert!(fields.get(field).is_some(), "missing {field}");
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_field_error() {
        let store = MemoryStore::new();
        let service = UserService::new(&store, &store);
        service
            .create_staff(form("otieno@shop.co.ke", UserRole::DeliveryStaff))
            .await
            .unwrap();
        let AppError::Validation(fields) = service
            .create_staff(form("OTIENO@shop.co.ke", UserRole::ProductManager))
            .await
            .unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert!(fields.get("email").is_some());
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_deactivate_or_delete_self() {
        let store = MemoryStore::new();
        let service = UserService::new(&store, &store);
        let admin = service
            .create_staff(form("admin@shop.co.ke", UserRole::Admin))
            .await
            .unwrap();
        let me = actor(&admin);

        assert!(matches!(
            service.update_role(&me, admin.id, UserRole::Customer).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service
                .update_status(&me, admin.id, AccountStatus::Inactive)
                .await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.delete(&me, admin.id).await,
            Err(AppError::BadRequest(_))
        ));

        let other = service
            .create_staff(form("rider@shop.co.ke", UserRole::DeliveryStaff))
            .await
            .unwrap();
        let updated = service
            .update_status(&me, other.id, AccountStatus::Suspended)
            .await
            .unwrap();
        assert_eq!(updated.status, AccountStatus::Suspended);
        service.delete(&me, other.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_register_customer_ignores_requested_role() {
        let store = MemoryStore::new();
        let service = UserService::new(&store, &store);
        let user = service
            .register_customer(form("buyer@mail.co.ke", UserRole::Admin))
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::Customer);
    }
}
