//! Status and classification enums for store entities.
//!
//! Every enum is stored as `TEXT` using its `snake_case` name, serializes the
//! same way in JSON, and parses back through [`FromStr`].

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored and serialized name of this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_owned() }),
                }
            }
        }
    };
}

text_enum! {
    /// Physical condition of a second-hand item.
    ProductCondition ("product condition") {
        New => "new",
        LikeNew => "like_new",
        Good => "good",
        Fair => "fair",
    }
}

impl ProductCondition {
    /// Human label printed on product tags.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::LikeNew => "Like new",
            Self::Good => "Good",
            Self::Fair => "Fair",
        }
    }
}

text_enum! {
    /// Listing status of a product.
    ///
    /// Thrift items are one-of-a-kind: an item is `reserved` while an order
    /// for it is open and `sold` once that order is delivered.
    ProductStatus ("product status") {
        Draft => "draft",
        Active => "active",
        Reserved => "reserved",
        Sold => "sold",
        Archived => "archived",
    }
}

text_enum! {
    /// Order fulfillment status.
    OrderStatus ("order status") {
        Pending => "pending",
        Processing => "processing",
        Ready => "ready",
        OutForDelivery => "out_for_delivery",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

impl OrderStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The next status along the fulfillment path, if any.
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Processing),
            Self::Processing => Some(Self::Ready),
            Self::Ready => Some(Self::OutForDelivery),
            Self::OutForDelivery => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether an order may move from `self` to `target`.
    ///
    /// Orders only move one step forward along the fulfillment path, and any
    /// open order may be cancelled.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == Self::Cancelled || self.next() == Some(target)
    }

    /// Customer-facing wording used in notifications.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Ready => "Ready",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

text_enum! {
    /// Payment status of an order.
    PaymentStatus ("payment status") {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
        Refunded => "refunded",
    }
}

text_enum! {
    /// Payment methods a customer can choose at checkout.
    PaymentMethod ("payment method") {
        Mpesa => "mpesa",
        Card => "card",
        CashOnDelivery => "cash_on_delivery",
        Paypal => "paypal",
    }
}

impl PaymentMethod {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Mpesa => "M-Pesa",
            Self::Card => "Card",
            Self::CashOnDelivery => "Cash on delivery",
            Self::Paypal => "PayPal",
        }
    }
}

text_enum! {
    /// Role of a user account.
    UserRole ("user role") {
        /// Full access including staff management and settings.
        Admin => "admin",
        /// Uploads and edits catalog items.
        ProductManager => "product_manager",
        /// Picks, packs and prints for orders.
        OrderPreparer => "order_preparer",
        /// Delivers orders assigned to them.
        DeliveryStaff => "delivery_staff",
        /// Storefront shopper.
        Customer => "customer",
    }
}

impl UserRole {
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        !matches!(self, Self::Customer)
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::ProductManager => "Product manager",
            Self::OrderPreparer => "Order preparer",
            Self::DeliveryStaff => "Delivery staff",
            Self::Customer => "Customer",
        }
    }
}

text_enum! {
    /// Whether an account may sign in.
    AccountStatus ("account status") {
        Active => "active",
        Inactive => "inactive",
        Suspended => "suspended",
    }
}

text_enum! {
    /// Progress of a delivery assignment.
    DeliveryStatus ("delivery status") {
        Assigned => "assigned",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

text_enum! {
    /// Lifecycle of a print job.
    PrintJobStatus ("print job status") {
        Queued => "queued",
        Sent => "sent",
        Completed => "completed",
        Failed => "failed",
    }
}

text_enum! {
    /// Printable documents.
    DocumentKind ("document kind") {
        Receipt => "receipt",
        ShippingLabel => "shipping_label",
        ProductLabel => "product_label",
    }
}

text_enum! {
    /// Where a print request should go.
    PrintOutput ("print output") {
        Printer => "printer",
        Pdf => "pdf",
    }
}

text_enum! {
    /// Channels used for customer notifications and campaigns.
    Channel ("channel") {
        Email => "email",
        Sms => "sms",
        Banner => "banner",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_roundtrip_for_every_variant() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        for role in UserRole::ALL {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), *role);
        }
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
        let condition: ProductCondition = serde_json::from_str("\"like_new\"").unwrap();
        assert_eq!(condition, ProductCondition::LikeNew);
    }

    #[test]
    fn test_unknown_variant_message() {
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid order status: shipped");
    }

    #[test]
    fn test_order_status_forward_path() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::OutForDelivery));
        assert!(OrderStatus::OutForDelivery.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Processing));
    }

    #[test]
    fn test_order_status_cancellation_and_terminal_states() {
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
        assert_eq!(OrderStatus::Delivered.next(), None);
    }
}
