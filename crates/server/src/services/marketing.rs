//! Marketing campaigns.

use chrono::{DateTime, Utc};
use tracing::instrument;

use thriftstore_core::CampaignId;

use super::non_blank;
use crate::db::{ContentStore, RepositoryError};
use crate::error::{AppError, FieldErrors};
use crate::models::{Campaign, CampaignForm, CampaignState, NewCampaign};

pub const MAX_DISCOUNT_PERCENT: i32 = 90;

pub struct CampaignService<'a> {
    content: &'a dyn ContentStore,
}

impl<'a> CampaignService<'a> {
    #[must_use]
    pub const fn new(content: &'a dyn ContentStore) -> Self {
        Self { content }
    }

    /// Campaigns, optionally only those in `state` at `now`.
    pub async fn list(
        &self,
        state: Option<CampaignState>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Campaign>, AppError> {
        let campaigns = self.content.list_campaigns().await?;
        Ok(campaigns
            .into_iter()
            .filter(|c| state.is_none_or(|s| c.state_at(now) == s))
            .collect())
    }

    pub async fn get(&self, id: CampaignId) -> Result<Campaign, AppError> {
        self.content
            .get_campaign(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("campaign {id}")))
    }

    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create(&self, form: CampaignForm) -> Result<Campaign, AppError> {
        let new = validate(form)?;
        let campaign = self
            .content
            .insert_campaign(new)
            .await
            .map_err(code_conflict)?;
        tracing::info!(campaign_id = %campaign.id, channel = %campaign.channel, "Campaign created");
        Ok(campaign)
    }

    #[instrument(skip(self, form))]
    pub async fn update(&self, id: CampaignId, form: CampaignForm) -> Result<Campaign, AppError> {
        let existing = self.get(id).await?;
        let new = validate(form)?;
        let updated = Campaign {
            name: new.name,
            channel: new.channel,
            discount_code: new.discount_code,
            discount_percent: new.discount_percent,
            message: new.message,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            ..existing
        };
        self.content
            .update_campaign(&updated)
            .await
            .map_err(code_conflict)?;
        Ok(updated)
    }

    pub async fn delete(&self, id: CampaignId) -> Result<(), AppError> {
        self.content.delete_campaign(id).await?;
        Ok(())
    }
}

fn validate(form: CampaignForm) -> Result<NewCampaign, AppError> {
    let mut errors = FieldErrors::new();
    let name = form.name.trim().to_owned();
    if name.is_empty() {
        errors.add("name", "name is required");
    }
    if form.ends_at <= form.starts_at {
        errors.add("ends_at", "end must be after the start");
    }
    if form
        .discount_percent
        .is_some_and(|p| !(0..=MAX_DISCOUNT_PERCENT).contains(&p))
    {
        errors.add(
            "discount_percent",
            format!("discount must be between 0 and {MAX_DISCOUNT_PERCENT}%"),
        );
    }
    let discount_code = non_blank(form.discount_code.as_deref()).map(|c| c.to_uppercase());
    if discount_code
        .as_deref()
        .is_some_and(|c| !c.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-'))
    {
        errors.add(
            "discount_code",
            "use letters, digits and dashes only",
        );
    }
    if discount_code.is_some() && form.discount_percent.is_none() {
        errors.add("discount_percent", "a discount code needs a percentage");
    }
    errors.into_result()?;

    Ok(NewCampaign {
        name,
        channel: form.channel,
        discount_code,
        discount_percent: form.discount_percent,
        message: form.message.trim().to_owned(),
        starts_at: form.starts_at,
        ends_at: form.ends_at,
    })
}

fn code_conflict(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::Conflict(_) => {
            AppError::field("discount_code", "this discount code is already in use")
        }
        other => other.into(),
    }
}
