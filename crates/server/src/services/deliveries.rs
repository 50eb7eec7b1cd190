//! Delivery staff workflow over assigned orders.

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;
use url::Url;

use thriftstore_core::{DeliveryStatus, OrderId, OrderStatus, ProductStatus, UserRole};

use super::non_blank;
use super::notifications::NotificationService;
use crate::db::Stores;
use crate::error::AppError;
use crate::models::{CurrentUser, Order, OrderFilter, ShippingInfo};
use crate::state::AppState;

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// An assigned order with a link for navigation.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryView {
    #[serde(flatten)]
    pub order: Order,
    pub map_link: String,
}

pub struct DeliveryService<'a> {
    stores: &'a Stores,
    notifications: NotificationService<'a>,
}

impl<'a> DeliveryService<'a> {
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

    /// Orders assigned to `staff`, optionally narrowed to one delivery status.
    pub async fn list_assigned(
        &self,
        staff: &CurrentUser,
        status: Option<DeliveryStatus>,
    ) -> Result<Vec<DeliveryView>, AppError> {
        let filter = OrderFilter {
            delivery_staff_id: Some(staff.id),
            ..OrderFilter::default()
        };
        let orders = self.stores.orders.list_orders().await?;
        Ok(orders
            .into_iter()
            .filter(|o| filter.matches(o))
            .filter(|o| {
                status.is_none_or(|s| o.delivery.as_ref().is_some_and(|d| d.status == s))
            })
            .map(|order| DeliveryView {
                map_link: map_link(&order.shipping),
                order,
            })
            .collect())
    }

    /// Leave with the parcel: assigned to in progress, order out for delivery.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn start_delivery(&self, actor: &CurrentUser, id: OrderId) -> Result<Order, AppError> {
        let mut order = self.assigned_order(actor, id).await?;
        let now = Utc::now();
        let delivery = order
            .delivery
            .as_mut()
            .ok_or_else(|| AppError::BadRequest("order has no delivery".to_string()))?;
        if delivery.status != DeliveryStatus::Assigned {
            return Err(AppError::BadRequest(
                "delivery has already started".to_string(),
            ));
        }
        if !order.status.can_transition_to(OrderStatus::OutForDelivery) {
            return Err(AppError::BadRequest(format!(
                "order is {}",
                order.status.label().to_lowercase()
            )));
        }
        delivery.status = DeliveryStatus::InProgress;
        delivery.started_at = Some(now);
        order.status = OrderStatus::OutForDelivery;
        order.updated_at = now;

        self.stores.orders.save_order_state(&order).await?;
        tracing::info!(order_number = %order.order_number, "Delivery started");
        self.notifications.notify_status_changed(&order).await;
        Ok(order)
    }

    /// Hand over the parcel: in progress to completed, order delivered.
    #[instrument(skip(self, actor, notes), fields(actor_id = %actor.id))]
    pub async fn complete_delivery(
        &self,
        actor: &CurrentUser,
        id: OrderId,
        notes: Option<String>,
    ) -> Result<Order, AppError> {
        let mut order = self.assigned_order(actor, id).await?;
        let now = Utc::now();
        let delivery = order
            .delivery
            .as_mut()
            .ok_or_else(|| AppError::BadRequest("order has no delivery".to_string()))?;
        if delivery.status != DeliveryStatus::InProgress {
            return Err(AppError::BadRequest(
                "start the delivery before completing it".to_string(),
            ));
        }
        delivery.status = DeliveryStatus::Completed;
        delivery.completed_at = Some(now);
        if let Some(notes) = non_blank(notes.as_deref()) {
            delivery.notes = Some(notes);
        }
        order.status = OrderStatus::Delivered;
        order.updated_at = now;

        let product_ids: Vec<_> = order.product_ids().collect();
        self.stores
            .catalog
            .set_product_status(&product_ids, ProductStatus::Sold)
            .await?;
        self.stores.orders.save_order_state(&order).await?;
        tracing::info!(order_number = %order.order_number, "Delivery completed");
        self.notifications.notify_status_changed(&order).await;
        Ok(order)
    }

    async fn assigned_order(&self, actor: &CurrentUser, id: OrderId) -> Result<Order, AppError> {
        let order = self
            .stores
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
        let assigned_to = order.delivery.as_ref().map(|d| d.staff_id);
        if actor.role != UserRole::Admin && assigned_to != Some(actor.id) {
            return Err(AppError::Forbidden(
                "this delivery is assigned to someone else".to_string(),
            ));
        }
        Ok(order)
    }
}

/// Maps search link for the shipping address.
#[must_use]
pub fn map_link(shipping: &ShippingInfo) -> String {
    let query = format!("{}, Kenya", shipping.formatted_address());
    match Url::parse_with_params(MAPS_SEARCH_URL, [("api", "1"), ("query", query.as_str())]) {
        Ok(url) => url.into(),
        Err(_) => MAPS_SEARCH_URL.to_owned(),
    }
}
