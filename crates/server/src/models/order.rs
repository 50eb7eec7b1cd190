//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use thriftstore_core::{
    DeliveryStatus, Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus, PhoneNumber,
    ProductId, ShippingZoneId, UserId,
};

/// A customer order with its items, shipping and delivery details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: PhoneNumber,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    /// Whether `tax` is already inside the item prices rather than added.
    pub tax_inclusive: bool,
    pub total: Decimal,
    pub shipping: ShippingInfo,
    pub delivery: Option<DeliveryInfo>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Product IDs on this order.
    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.items.iter().map(|item| item.product_id)
    }

    /// Whether `contact` (an email or phone number) identifies the customer.
    #[must_use]
    pub fn matches_contact(&self, contact: &str) -> bool {
        if let Ok(email) = Email::parse(contact) {
            return email == self.customer_email;
        }
        PhoneNumber::parse(contact).is_ok_and(|phone| phone == self.customer_phone)
    }
}

/// A single line on an order. Thrift items are unique so `quantity` is
/// normally 1, but the column is kept for bundles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub recipient_name: String,
    pub phone: PhoneNumber,
    pub address_line: String,
    pub city: String,
    pub region: String,
    pub postal_code: Option<String>,
    pub zone_id: Option<ShippingZoneId>,
    pub instructions: Option<String>,
}

impl ShippingInfo {
    /// Single-line address, e.g. `12 Moi Avenue, Nairobi, Nairobi County 00100`.
    #[must_use]
    pub fn formatted_address(&self) -> String {
        let mut address = format!("{}, {}, {}", self.address_line, self.city, self.region);
        if let Some(code) = self.postal_code.as_deref().filter(|c| !c.trim().is_empty()) {
            address.push(' ');
            address.push_str(code.trim());
        }
        address
    }
}

/// Delivery assignment for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub staff_id: UserId,
    pub staff_name: String,
    pub status: DeliveryStatus,
    pub assigned_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Validated values for inserting an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: PhoneNumber,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    /// Whether `tax` is already inside the item prices rather than added.
    pub tax_inclusive: bool,
    pub total: Decimal,
    pub shipping: ShippingInfo,
    pub notes: Option<String>,
}

/// Shipping section of the checkout form.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingForm {
    /// Defaults to the customer name.
    #[serde(default)]
    pub recipient_name: Option<String>,
    pub address_line: String,
    pub city: String,
    pub region: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Checkout submission.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping: ShippingForm,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    /// Filled from the session cart by the storefront; staff may pass it directly.
    #[serde(default)]
    pub items: Vec<ProductId>,
}

/// Query parameters for order listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Search over order number, customer name, email and phone.
    pub q: Option<String>,
    #[serde(skip)]
    pub customer_id: Option<UserId>,
    #[serde(skip)]
    pub delivery_staff_id: Option<UserId>,
}

impl OrderFilter {
    /// Whether `order` passes every filter that is set.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|s| s != order.status) {
            return false;
        }
        if self.payment_status.is_some_and(|s| s != order.payment_status) {
            return false;
        }
        if self.customer_id.is_some() && self.customer_id != order.customer_id {
            return false;
        }
        if let Some(staff) = self.delivery_staff_id
            && order.delivery.as_ref().map(|d| d.staff_id) != Some(staff)
        {
            return false;
        }
        match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                order.order_number.to_lowercase().contains(&q)
                    || order.customer_name.to_lowercase().contains(&q)
                    || order.customer_email.as_str().contains(&q)
                    || order.customer_phone.as_str().contains(&q)
            }
            _ => true,
        }
    }
}
