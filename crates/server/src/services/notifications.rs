//! Customer notifications for order events.
//!
//! Sending never fails the operation that triggered it: every attempt is
//! written to the notification log with its outcome, and problems are only
//! logged. Channels without configuration are recorded as `simulated`.

use thriftstore_core::{Channel, Email, PhoneNumber, Price};

use super::email::{EmailService, NotificationEmail};
use super::settings::SettingsService;
use super::sms::SmsGateway;
use crate::db::{NotificationStore, SettingsStore};
use crate::error::AppError;
use crate::models::{
    DeliveryOutcome, EventSettings, NewNotification, NotificationEvent, NotificationRecord, Order,
    StoreSettings,
};
use crate::state::AppState;

/// Largest page of the notification log.
pub const MAX_LOG_PAGE: usize = 500;

pub struct NotificationService<'a> {
    log: &'a dyn NotificationStore,
    settings: &'a dyn SettingsStore,
    email: Option<&'a EmailService>,
    sms: Option<SmsGateway<'a>>,
}

impl<'a> NotificationService<'a> {
    /// A service with no outbound channels; every send is simulated.
    #[must_use]
    pub const fn new(log: &'a dyn NotificationStore, settings: &'a dyn SettingsStore) -> Self {
        Self {
            log,
            settings,
            email: None,
            sms: None,
        }
    }

    /// Wire in whichever channels the configuration enables.
    #[must_use]
    pub fn from_state(state: &'a AppState) -> Self {
        let stores = state.stores();
        Self {
            log: stores.notifications.as_ref(),
            settings: stores.settings.as_ref(),
            email: state.email(),
            sms: state
                .config()
                .sms
                .as_ref()
                .map(|config| SmsGateway::new(state.http(), config)),
        }
    }

    pub async fn notify_order_placed(&self, order: &Order) -> Vec<NotificationRecord> {
        self.notify(order, NotificationEvent::OrderPlaced).await
    }

    pub async fn notify_status_changed(&self, order: &Order) -> Vec<NotificationRecord> {
        self.notify(order, NotificationEvent::StatusChanged).await
    }

    pub async fn notify_delivery_assigned(&self, order: &Order) -> Vec<NotificationRecord> {
        self.notify(order, NotificationEvent::DeliveryAssigned).await
    }

    pub async fn list_notifications(
        &self,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, AppError> {
        Ok(self
            .log
            .list_notifications(limit.clamp(1, MAX_LOG_PAGE))
            .await?)
    }

    /// Send a test message to `recipient` over `channel`.
    pub async fn send_test_notification(
        &self,
        channel: Channel,
        recipient: &str,
    ) -> Result<NotificationRecord, AppError> {
        let store = SettingsService::new(self.settings).store_settings().await?;
        let message = format!("This is a test notification from {}.", store.store_name);
        let subject = "Test notification";

        let (recipient, outcome) = match channel {
            Channel::Email => {
                let email = Email::parse(recipient)
                    .map_err(|e| AppError::field("recipient", e.to_string()))?;
                let outcome = self
                    .send_email(&email, subject, &message, None, &store)
                    .await;
                (email.into_inner(), outcome)
            }
            Channel::Sms => {
                let phone = PhoneNumber::parse(recipient)
                    .map_err(|e| AppError::field("recipient", e.to_string()))?;
                let outcome = self.send_sms(&phone, &message).await;
                (phone.as_str().to_owned(), outcome)
            }
            Channel::Banner => {
                return Err(AppError::BadRequest(
                    "banners are shown on the storefront, not sent".to_string(),
                ));
            }
        };

        Ok(self
            .log
            .insert_notification(NewNotification {
                order_id: None,
                event: NotificationEvent::Test,
                channel,
                recipient,
                message,
                outcome: outcome.0,
                error: outcome.1,
            })
            .await?)
    }

    async fn notify(&self, order: &Order, event: NotificationEvent) -> Vec<NotificationRecord> {
        let settings = SettingsService::new(self.settings);
        let (config, store) = match (
            settings.notification_settings().await,
            settings.store_settings().await,
        ) {
            (Ok(config), Ok(store)) => (config, store),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, order = %order.order_number, "Notification settings unavailable");
                return Vec::new();
            }
        };
        let event_settings: &EventSettings = match event {
            NotificationEvent::OrderPlaced => &config.order_placed,
            NotificationEvent::StatusChanged => &config.status_changed,
            NotificationEvent::DeliveryAssigned => &config.delivery_assigned,
            NotificationEvent::Test => return Vec::new(),
        };

        let message = render_template(&event_settings.template, order, &store);
        let subject = subject_for(event, order);
        let mut records = Vec::new();

        if event_settings.email {
            let outcome = self
                .send_email(
                    &order.customer_email,
                    &subject,
                    &message,
                    Some(&order.order_number),
                    &store,
                )
                .await;
            records.extend(
                self.record(order, event, Channel::Email, order.customer_email.as_str(), &message, outcome)
                    .await,
            );
        }
        if event_settings.sms {
            let outcome = self.send_sms(&order.customer_phone, &message).await;
            records.extend(
                self.record(order, event, Channel::Sms, order.customer_phone.as_str(), &message, outcome)
                    .await,
            );
        }
        records
    }

    async fn send_email(
        &self,
        to: &Email,
        subject: &str,
        message: &str,
        order_number: Option<&str>,
        store: &StoreSettings,
    ) -> (DeliveryOutcome, Option<String>) {
        let Some(email) = self.email else {
            tracing::info!(to = %to, subject, "Email channel not configured, simulating");
            return (DeliveryOutcome::Simulated, None);
        };
        let rendered = NotificationEmail {
            store_name: &store.store_name,
            subject,
            message,
            order_number,
        };
        match email.send_notification(to.as_str(), &rendered).await {
            Ok(()) => (DeliveryOutcome::Sent, None),
            Err(e) => {
                tracing::warn!(error = %e, to = %to, "Email notification failed");
                (DeliveryOutcome::Failed, Some(e.to_string()))
            }
        }
    }

    async fn send_sms(&self, to: &PhoneNumber, message: &str) -> (DeliveryOutcome, Option<String>) {
        let Some(sms) = self.sms else {
            tracing::info!(to = %to.last_four(), "SMS channel not configured, simulating");
            return (DeliveryOutcome::Simulated, None);
        };
        match sms.send(to, message).await {
            Ok(()) => (DeliveryOutcome::Sent, None),
            Err(e) => {
                tracing::warn!(error = %e, to = %to.last_four(), "SMS notification failed");
                (DeliveryOutcome::Failed, Some(e.to_string()))
            }
        }
    }

    async fn record(
        &self,
        order: &Order,
        event: NotificationEvent,
        channel: Channel,
        recipient: &str,
        message: &str,
        (outcome, error): (DeliveryOutcome, Option<String>),
    ) -> Option<NotificationRecord> {
        let result = self
            .log
            .insert_notification(NewNotification {
                order_id: Some(order.id),
                event,
                channel,
                recipient: recipient.to_owned(),
                message: message.to_owned(),
                outcome,
                error,
            })
            .await;
        match result {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::error!(error = %e, order = %order.order_number, "Failed to log notification");
                None
            }
        }
    }
}

fn subject_for(event: NotificationEvent, order: &Order) -> String {
    match event {
        NotificationEvent::OrderPlaced => format!("Order {} received", order.order_number),
        NotificationEvent::StatusChanged => {
            format!("Order {} is {}", order.order_number, order.status.label().to_lowercase())
        }
        NotificationEvent::DeliveryAssigned => {
            format!("Order {} is on its way", order.order_number)
        }
        NotificationEvent::Test => "Test notification".to_owned(),
    }
}

/// Fill `{order_number}`, `{customer_name}`, `{status}` and `{total}`.
#[must_use]
pub fn render_template(template: &str, order: &Order, store: &StoreSettings) -> String {
    template
        .replace("{order_number}", &order.order_number)
        .replace("{customer_name}", &order.customer_name)
        .replace("{status}", &order.status.label().to_lowercase())
        .replace(
            "{total}",
            &Price::new(order.total, store.currency).display(),
        )
}
