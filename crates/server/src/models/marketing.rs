//! Marketing campaigns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thriftstore_core::{CampaignId, Channel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub channel: Channel,
    pub discount_code: Option<String>,
    pub discount_percent: Option<i32>,
    pub message: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Where the campaign sits relative to `now`.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> CampaignState {
        if now < self.starts_at {
            CampaignState::Scheduled
        } else if now < self.ends_at {
            CampaignState::Active
        } else {
            CampaignState::Ended
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    Scheduled,
    Active,
    Ended,
}

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub name: String,
    pub channel: Channel,
    pub discount_code: Option<String>,
    pub discount_percent: Option<i32>,
    pub message: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignForm {
    pub name: String,
    pub channel: Channel,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub discount_percent: Option<i32>,
    #[serde(default)]
    pub message: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}
