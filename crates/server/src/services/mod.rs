//! Business logic.
//!
//! Services borrow the repositories they need for the duration of one
//! request and return [`AppError`](crate::error::AppError) so handlers can
//! use `?` directly.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod deliveries;
pub mod documents;
pub mod email;
pub mod help;
pub mod marketing;
pub mod notifications;
pub mod orders;
pub mod printing;
pub mod scanning;
pub mod settings;
pub mod sms;
pub mod users;

pub use auth::AuthService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use deliveries::DeliveryService;
pub use help::HelpService;
pub use marketing::CampaignService;
pub use notifications::NotificationService;
pub use orders::OrderService;
pub use printing::PrintService;
pub use scanning::ScanService;
pub use settings::SettingsService;
pub use users::UserService;

/// URL-safe slug: lowercase ASCII alphanumerics separated by single dashes.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Trimmed text, or `None` when blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    //! Fixtures shared by service tests.

    use rust_decimal::Decimal;
    use thriftstore_core::{
        AccountStatus, Email, PaymentMethod, ProductCondition, ProductId, ProductStatus, UserRole,
    };

    use super::slugify;
    use crate::db::Stores;
    use crate::models::{CheckoutRequest, NewProduct, NewUser, Product, ShippingForm, User};

    pub async fn seed_product(stores: &Stores, name: &str, price: i64) -> Product {
        let barcode = format!("TEST-{}", slugify(name));
        stores
            .catalog
            .insert_product(NewProduct {
                name: name.to_owned(),
                description: None,
                price: Decimal::new(price, 0),
                original_price: None,
                category_id: None,
                sub_category_id: None,
                condition: ProductCondition::Good,
                barcode,
                status: ProductStatus::Active,
                tags: Vec::new(),
                images: Vec::new(),
                featured: false,
            })
            .await
            .unwrap()
    }

    pub async fn seed_staff(stores: &Stores, email: &str, role: UserRole) -> User {
        stores
            .users
            .insert_user(NewUser {
                name: email.split('@').next().unwrap_or(email).to_owned(),
                email: Email::parse(email).unwrap(),
                phone: None,
                role,
                status: AccountStatus::Active,
                password_hash: super::auth::hash_password("correct horse").unwrap(),
            })
            .await
            .unwrap()
    }

    pub fn checkout_for(items: &[ProductId]) -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "Wanjiku Kamau".to_owned(),
            email: "wanjiku@example.com".to_owned(),
            phone: "0712 345 678".to_owned(),
            shipping: ShippingForm {
                recipient_name: None,
                address_line: "Ngong Road, Adams Arcade".to_owned(),
                city: "Nairobi".to_owned(),
                region: "Nairobi".to_owned(),
                postal_code: Some("00100".to_owned()),
                instructions: None,
            },
            payment_method: PaymentMethod::Mpesa,
            notes: None,
            items: items.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Women's Dresses"), "women-s-dresses");
        assert_eq!(slugify("  Shoes & Bags  "), "shoes-bags");
        assert_eq!(slugify("Kids 2-5 yrs"), "kids-2-5-yrs");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  hi ")), Some("hi".to_owned()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
