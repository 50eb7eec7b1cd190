//! Store configuration records edited from the settings screens.
//!
//! Each collection is persisted as one JSON document in the `settings`
//! table, keyed by [`ShippingZone::KEY`], [`TaxCategory::KEY`] and so on.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use thriftstore_core::{CurrencyCode, PaymentMethod, ShippingZoneId, TaxCategoryId};

/// A delivery zone and its fees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingZone {
    pub id: ShippingZoneId,
    pub name: String,
    /// Region (county) names served by this zone.
    pub regions: Vec<String>,
    pub base_fee: Decimal,
    /// Orders at or above this subtotal ship free.
    pub free_shipping_threshold: Option<Decimal>,
    pub estimated_days: u16,
    pub active: bool,
}

impl ShippingZone {
    pub const KEY: &'static str = "shipping_zones";

    /// Whether the zone serves `region` (case-insensitive).
    #[must_use]
    pub fn serves(&self, region: &str) -> bool {
        let region = region.trim();
        self.regions.iter().any(|r| r.eq_ignore_ascii_case(region))
    }

    /// Fee charged for an order with the given subtotal.
    #[must_use]
    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        match self.free_shipping_threshold {
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => self.base_fee,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingZoneForm {
    pub name: String,
    pub regions: Vec<String>,
    pub base_fee: Decimal,
    #[serde(default)]
    pub free_shipping_threshold: Option<Decimal>,
    #[serde(default = "default_days")]
    pub estimated_days: u16,
    #[serde(default = "default_true")]
    pub active: bool,
}

const fn default_days() -> u16 {
    3
}

const fn default_true() -> bool {
    true
}

/// A tax rate applied at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCategory {
    pub id: TaxCategoryId,
    pub name: String,
    pub rate_percent: Decimal,
    /// Prices already include this tax; it is reported but not added.
    pub inclusive: bool,
    pub is_default: bool,
}

impl TaxCategory {
    pub const KEY: &'static str = "tax_categories";

    /// Tax due on `amount` (before rounding).
    #[must_use]
    pub fn tax_on(&self, amount: Decimal) -> Decimal {
        if self.inclusive {
            amount * self.rate_percent / (Decimal::ONE_HUNDRED + self.rate_percent)
        } else {
            amount * self.rate_percent / Decimal::ONE_HUNDRED
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaxCategoryForm {
    pub name: String,
    pub rate_percent: Decimal,
    #[serde(default)]
    pub inclusive: bool,
    #[serde(default)]
    pub is_default: bool,
}

/// Configuration of one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodConfig {
    pub method: PaymentMethod,
    pub enabled: bool,
    pub display_name: String,
    pub instructions: Option<String>,
    /// Provider keys (consumer key, till number, ...). Never returned unmasked.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

impl PaymentMethodConfig {
    pub const KEY: &'static str = "payment_methods";
    pub const MASK: &'static str = "********";

    /// Copy with every credential value replaced by [`Self::MASK`].
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            credentials: self
                .credentials
                .keys()
                .map(|k| (k.clone(), Self::MASK.to_owned()))
                .collect(),
            ..self.clone()
        }
    }

    /// Defaults used on first start.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        PaymentMethod::ALL
            .iter()
            .map(|method| Self {
                method: *method,
                enabled: matches!(method, PaymentMethod::Mpesa | PaymentMethod::CashOnDelivery),
                display_name: method.label().to_owned(),
                instructions: None,
                credentials: BTreeMap::new(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodUpdate {
    pub enabled: Option<bool>,
    pub display_name: Option<String>,
    pub instructions: Option<String>,
    /// Values equal to the mask are ignored so redacted forms can be re-submitted.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

/// Channels and template for one notification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSettings {
    pub email: bool,
    pub sms: bool,
    /// Supports `{order_number}`, `{customer_name}`, `{status}` and `{total}`.
    pub template: String,
}

/// Customer notification preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub order_placed: EventSettings,
    pub status_changed: EventSettings,
    pub delivery_assigned: EventSettings,
}

impl NotificationSettings {
    pub const KEY: &'static str = "notifications";
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            order_placed: EventSettings {
                email: true,
                sms: true,
                template: "Hi {customer_name}, we received order {order_number} ({total}). Thank you for shopping with us!".to_owned(),
            },
            status_changed: EventSettings {
                email: true,
                sms: false,
                template: "Order {order_number} is now {status}.".to_owned(),
            },
            delivery_assigned: EventSettings {
                email: false,
                sms: true,
                template: "Hi {customer_name}, order {order_number} has been assigned for delivery.".to_owned(),
            },
        }
    }
}

/// Store identity printed on receipts and labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub store_name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub receipt_footer: String,
    pub currency: CurrencyCode,
}

impl StoreSettings {
    pub const KEY: &'static str = "store";
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_name: "Thrift Store".to_owned(),
            address: "Nairobi, Kenya".to_owned(),
            phone: None,
            email: None,
            receipt_footer: "Thank you for shopping second-hand!".to_owned(),
            currency: CurrencyCode::KES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> ShippingZone {
        ShippingZone {
            id: ShippingZoneId::new(1),
            name: "Nairobi Metro".to_owned(),
            regions: vec!["Nairobi".to_owned(), "Kiambu".to_owned()],
            base_fee: Decimal::new(250, 0),
            free_shipping_threshold: Some(Decimal::new(5000, 0)),
            estimated_days: 1,
            active: true,
        }
    }

    #[test]
    fn test_zone_serves_case_insensitively() {
        assert!(zone().serves(" nairobi "));
        assert!(!zone().serves("Mombasa"));
    }

    #[test]
    fn test_free_shipping_threshold_is_inclusive() {
        assert_eq!(zone().fee_for(Decimal::new(4999, 0)), Decimal::new(250, 0));
        assert_eq!(zone().fee_for(Decimal::new(5000, 0)), Decimal::ZERO);
    }

    #[test]
    fn test_tax_exclusive_and_inclusive() {
        let mut vat = TaxCategory {
            id: TaxCategoryId::new(1),
            name: "VAT".to_owned(),
            rate_percent: Decimal::new(16, 0),
            inclusive: false,
            is_default: true,
        };
        assert_eq!(vat.tax_on(Decimal::new(1000, 0)), Decimal::new(160, 0));

        vat.inclusive = true;
        assert_eq!(vat.tax_on(Decimal::new(1160, 0)), Decimal::new(160, 0));
    }

    #[test]
    fn test_payment_credentials_are_masked() {
        let mut config = PaymentMethodConfig::defaults().remove(0);
        config
            .credentials
            .insert("consumer_secret".to_owned(), "s3cr3t-value".to_owned());
        let redacted = config.redacted();
        assert_eq!(
            redacted.credentials.get("consumer_secret").map(String::as_str),
            Some(PaymentMethodConfig::MASK)
        );
    }
}
