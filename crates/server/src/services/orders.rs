//! Order placement and fulfilment.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use thriftstore_core::{
    AccountStatus, DeliveryStatus, Email, OrderId, OrderStatus, PaymentStatus, PhoneNumber, Price, ProductId,
    ProductStatus, UserId, UserRole, round_money,
};

use super::non_blank;
use super::notifications::NotificationService;
use super::settings::SettingsService;
use crate::db::{RepositoryError, Stores};
use crate::error::{AppError, FieldErrors};
use crate::models::{
    CheckoutRequest, DeliveryInfo, NewOrder, Order, OrderFilter, OrderItem, ShippingInfo,
};
use crate::state::AppState;

/// Number of recent orders on the dashboard.
const RECENT_ORDERS: usize = 5;

/// Order number for the `sequence`-th order of `day`: `TS-YYYYMMDD-NNNN`.
#[must_use]
pub fn order_number(day: NaiveDate, sequence: i32) -> String {
    format!("TS-{}-{sequence:04}", day.format("%Y%m%d"))
}

/// Back office dashboard figures.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_orders: usize,
    pub orders_by_status: BTreeMap<&'static str, usize>,
    /// Paid, non-cancelled orders.
    pub revenue: Decimal,
    pub revenue_display: String,
    pub active_products: usize,
    pub draft_products: usize,
    pub reserved_products: usize,
    pub sold_products: usize,
    pub awaiting_delivery: usize,
    pub recent_orders: Vec<Order>,
}

pub struct OrderService<'a> {
    stores: &'a Stores,
    notifications: NotificationService<'a>,
}

impl<'a> OrderService<'a> {
    /// Orders with simulated notifications.
    #[must_use]
    pub fn new(stores: &'a Stores) -> Self {
        Self {
            stores,
            notifications: NotificationService::new(
                stores.notifications.as_ref(),
                stores.settings.as_ref(),
            ),
        }
    }

    #[must_use]
    pub fn from_state(state: &'a AppState) -> Self {
        Self {
            stores: state.stores(),
            notifications: NotificationService::from_state(state),
        }
    }

    /// Validate a checkout, price it and reserve its products.
    ///
    /// # Errors
    ///
    /// `AppError::Validation` for bad contact or shipping details, unknown
    /// products, regions outside every zone or disabled payment methods.
    /// `AppError::Conflict` when an item is no longer for sale.
    #[instrument(skip(self, checkout), fields(items = checkout.items.len()))]
    pub async fn place_order(
        &self,
        checkout: CheckoutRequest,
        customer_id: Option<UserId>,
    ) -> Result<Order, AppError> {
        let settings = SettingsService::new(self.stores.settings.as_ref());
        let mut errors = FieldErrors::new();

        let customer_name = checkout.customer_name.trim().to_owned();
        if customer_name.is_empty() {
            errors.add("customer_name", "name is required");
        }
        let email = Email::parse(&checkout.email)
            .inspect_err(|e| errors.add("email", e.to_string()))
            .ok();
        let phone = PhoneNumber::parse(&checkout.phone)
            .inspect_err(|e| errors.add("phone", e.to_string()))
            .ok();

        let shipping = &checkout.shipping;
        for (field, value) in [
            ("address_line", &shipping.address_line),
            ("city", &shipping.city),
            ("region", &shipping.region),
        ] {
            if value.trim().is_empty() {
                errors.add(field, "this field is required");
            }
        }
        let zone = settings.resolve_zone(&shipping.region).await?;
        if zone.is_none() && !shipping.region.trim().is_empty() {
            errors.add("region", "we do not deliver to this region yet");
        }

        if !settings.is_payment_enabled(checkout.payment_method).await? {
            errors.add("payment_method", "this payment method is not available");
        }

        let mut product_ids: Vec<ProductId> = Vec::with_capacity(checkout.items.len());
        for id in &checkout.items {
            if !product_ids.contains(id) {
                product_ids.push(*id);
            }
        }
        if product_ids.is_empty() {
            errors.add("items", "add at least one item");
        }

        let mut items = Vec::with_capacity(product_ids.len());
        let mut unavailable = Vec::new();
        for id in product_ids {
            match self.stores.catalog.get_product(id).await? {
                None => errors.add("items", format!("product {id} does not exist")),
                Some(product) if !product.is_available() => unavailable.push(product.name),
                Some(product) => items.push(OrderItem {
                    product_id: product.id,
                    name: product.name,
                    unit_price: product.price,
                    quantity: 1,
                }),
            }
        }

        let (Some(email), Some(phone), Some(zone)) = (email, phone, zone) else {
            return Err(AppError::Validation(errors));
        };
        errors.into_result()?;
        if !unavailable.is_empty() {
            return Err(AppError::Conflict(format!(
                "no longer available: {}",
                unavailable.join(", ")
            )));
        }

        let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();
        let shipping_fee = zone.fee_for(subtotal);
        let (tax, tax_inclusive) = match settings.default_tax().await? {
            Some(tax) => (round_money(tax.tax_on(subtotal)), tax.inclusive),
            None => (Decimal::ZERO, false),
        };
        let added_tax = if tax_inclusive { Decimal::ZERO } else { tax };
        let total = round_money(subtotal + shipping_fee + added_tax);

        let today = Utc::now().date_naive();
        let sequence = self.stores.orders.next_order_sequence(today).await?;

        let order = self
            .stores
            .orders
            .insert_order(NewOrder {
                order_number: order_number(today, sequence),
                customer_id,
                customer_name: customer_name.clone(),
                customer_email: email,
                customer_phone: phone.clone(),
                payment_method: checkout.payment_method,
                items,
                subtotal,
                shipping_fee,
                tax,
                tax_inclusive,
                total,
                shipping: ShippingInfo {
                    recipient_name: non_blank(shipping.recipient_name.as_deref())
                        .unwrap_or(customer_name),
                    phone,
                    address_line: shipping.address_line.trim().to_owned(),
                    city: shipping.city.trim().to_owned(),
                    region: shipping.region.trim().to_owned(),
                    postal_code: non_blank(shipping.postal_code.as_deref()),
                    zone_id: Some(zone.id),
                    instructions: non_blank(shipping.instructions.as_deref()),
                },
                notes: non_blank(checkout.notes.as_deref()),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => AppError::Conflict(msg),
                other => other.into(),
            })?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "Order placed"
        );
        self.notifications.notify_order_placed(&order).await;
        Ok(order)
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        let orders = self.stores.orders.list_orders().await?;
        Ok(orders.into_iter().filter(|o| filter.matches(o)).collect())
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, AppError> {
        self.stores
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    /// Look up an order for a shopper who knows its number and contact.
    ///
    /// A wrong contact reads as not found.
    pub async fn track_order(&self, order_number: &str, contact: &str) -> Result<Order, AppError> {
        self.stores
            .orders
            .find_order_by_number(order_number.trim())
            .await?
            .filter(|order| order.matches_contact(contact))
            .ok_or_else(|| AppError::NotFound("no order matches those details".to_string()))
    }

    pub async fn account_orders(&self, customer: UserId) -> Result<Vec<Order>, AppError> {
        self.list_orders(&OrderFilter {
            customer_id: Some(customer),
            ..OrderFilter::default()
        })
        .await
    }

    /// Move an order along its lifecycle.
    ///
    /// Delivering marks the items sold; cancelling puts them back on sale.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, AppError> {
        let mut order = self.get_order(id).await?;
        if !order.status.can_transition_to(status) {
            return Err(AppError::BadRequest(format!(
                "cannot move order from {} to {}",
                order.status.label(),
                status.label()
            )));
        }

        let now = Utc::now();
        let product_ids: Vec<ProductId> = order.product_ids().collect();
        match status {
            OrderStatus::Delivered => {
                self.stores
                    .catalog
                    .set_product_status(&product_ids, ProductStatus::Sold)
                    .await?;
                if let Some(delivery) = order.delivery.as_mut() {
                    delivery.status = DeliveryStatus::Completed;
                    delivery.completed_at = Some(now);
                }
            }
            OrderStatus::Cancelled => {
                self.stores
                    .catalog
                    .set_product_status(&product_ids, ProductStatus::Active)
                    .await?;
            }
            _ => {}
        }

        let previous = order.status;
        order.status = status;
        order.updated_at = now;
        self.stores.orders.save_order_state(&order).await?;

        tracing::info!(
            order_number = %order.order_number,
            from = %previous,
            to = %status,
            "Order status changed"
        );
        self.notifications.notify_status_changed(&order).await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order, AppError> {
        let mut order = self.get_order(id).await?;
        order.payment_status = payment_status;
        order.updated_at = Utc::now();
        self.stores.orders.save_order_state(&order).await?;
        Ok(order)
    }

    /// Hand a ready order to an active delivery staff member.
    #[instrument(skip(self, notes))]
    pub async fn assign_delivery(
        &self,
        id: OrderId,
        staff_id: UserId,
        notes: Option<String>,
    ) -> Result<Order, AppError> {
        let mut order = self.get_order(id).await?;
        if order.status != OrderStatus::Ready {
            return Err(AppError::BadRequest(format!(
                "only ready orders can be assigned (order is {})",
                order.status.label().to_lowercase()
            )));
        }

        let staff = self
            .stores
            .users
            .get_user(staff_id)
            .await?
            .filter(|u| {
                u.role == UserRole::DeliveryStaff
                    && u.status == AccountStatus::Active
            })
            .ok_or_else(|| AppError::field("staff_id", "choose an active delivery staff member"))?;

        let now = Utc::now();
        order.delivery = Some(DeliveryInfo {
            staff_id: staff.id,
            staff_name: staff.name,
            status: DeliveryStatus::Assigned,
            assigned_at: now,
            started_at: None,
            completed_at: None,
            notes: non_blank(notes.as_deref()),
        });
        order.updated_at = now;
        self.stores.orders.save_order_state(&order).await?;

        tracing::info!(order_number = %order.order_number, staff_id = %staff_id, "Delivery assigned");
        self.notifications.notify_delivery_assigned(&order).await;
        Ok(order)
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, AppError> {
        let orders = self.stores.orders.list_orders().await?;
        let products = self.stores.catalog.list_products().await?;
        let store = SettingsService::new(self.stores.settings.as_ref())
            .store_settings()
            .await?;

        let mut orders_by_status: BTreeMap<&'static str, usize> =
            OrderStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        for order in &orders {
            *orders_by_status.entry(order.status.as_str()).or_default() += 1;
        }

        let revenue: Decimal = orders
            .iter()
            .filter(|o| {
                o.payment_status == PaymentStatus::Paid && o.status != OrderStatus::Cancelled
            })
            .map(|o| o.total)
            .sum();
        let count = |status: ProductStatus| products.iter().filter(|p| p.status == status).count();

        Ok(DashboardSummary {
            total_orders: orders.len(),
            orders_by_status,
            revenue,
            revenue_display: Price::new(revenue, store.currency).display(),
            active_products: count(ProductStatus::Active),
            draft_products: count(ProductStatus::Draft),
            reserved_products: count(ProductStatus::Reserved),
            sold_products: count(ProductStatus::Sold),
            awaiting_delivery: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Ready && o.delivery.is_none())
                .count(),
            recent_orders: orders.into_iter().take(RECENT_ORDERS).collect(),
        })
    }
}
