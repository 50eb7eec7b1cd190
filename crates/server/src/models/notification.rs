//! Customer notification log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thriftstore_core::{Channel, NotificationId, OrderId};

/// Event that triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    OrderPlaced,
    StatusChanged,
    DeliveryAssigned,
    Test,
}

impl NotificationEvent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPlaced => "order_placed",
            Self::StatusChanged => "status_changed",
            Self::DeliveryAssigned => "delivery_assigned",
            Self::Test => "test",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::OrderPlaced,
            Self::StatusChanged,
            Self::DeliveryAssigned,
            Self::Test,
        ]
        .into_iter()
        .find(|event| event.as_str() == s)
    }
}

/// What happened when a notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    /// The channel is not configured; the message was only logged.
    Simulated,
    Failed,
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Simulated => "simulated",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [Self::Sent, Self::Simulated, Self::Failed]
            .into_iter()
            .find(|outcome| outcome.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub order_id: Option<OrderId>,
    pub event: NotificationEvent,
    pub channel: Channel,
    pub recipient: String,
    pub message: String,
    pub outcome: DeliveryOutcome,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub order_id: Option<OrderId>,
    pub event: NotificationEvent,
    pub channel: Channel,
    pub recipient: String,
    pub message: String,
    pub outcome: DeliveryOutcome,
    pub error: Option<String>,
}
