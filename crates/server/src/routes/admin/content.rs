//! Marketing campaigns, help articles and the notification log.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use thriftstore_core::{ArticleId, CampaignId, Channel};

use crate::error::AppError;
use crate::middleware::{RequireStaff, ensure};
use crate::models::{
    Campaign, CampaignForm, CampaignState, HelpArticle, HelpArticleForm, NotificationRecord,
    Permission,
};
use crate::services::{CampaignService, HelpService, NotificationService};
use crate::state::AppState;

const DEFAULT_LOG_LIMIT: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route(
            "/campaigns/{id}",
            get(show_campaign).put(update_campaign).delete(delete_campaign),
        )
        .route("/help", get(list_articles).post(create_article))
        .route(
            "/help/{id}",
            get(show_article).put(update_article).delete(delete_article),
        )
        .route("/notifications", get(notification_log))
        .route("/notifications/test", post(test_notification))
}

#[derive(Debug, Default, Deserialize)]
pub struct CampaignQuery {
    pub state: Option<CampaignState>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TestNotification {
    pub channel: Channel,
    pub recipient: String,
}

// =============================================================================
// Campaigns
// =============================================================================

async fn list_campaigns(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<CampaignQuery>,
) -> Result<Json<Vec<Campaign>>, AppError> {
    ensure(&user, Permission::ManageMarketing)?;
    let campaigns = CampaignService::new(state.stores().content.as_ref())
        .list(query.state, Utc::now())
        .await?;
    Ok(Json(campaigns))
}

async fn show_campaign(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
) -> Result<Json<Campaign>, AppError> {
    ensure(&user, Permission::ManageMarketing)?;
    Ok(Json(CampaignService::new(state.stores().content.as_ref()).get(id).await?))
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
async fn create_campaign(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(form): Json<CampaignForm>,
) -> Result<(StatusCode, Json<Campaign>), AppError> {
    ensure(&user, Permission::ManageMarketing)?;
    let campaign = CampaignService::new(state.stores().content.as_ref())
        .create(form)
        .await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

async fn update_campaign(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    Json(form): Json<CampaignForm>,
) -> Result<Json<Campaign>, AppError> {
    ensure(&user, Permission::ManageMarketing)?;
    let campaign = CampaignService::new(state.stores().content.as_ref())
        .update(id, form)
        .await?;
    Ok(Json(campaign))
}

async fn delete_campaign(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
) -> Result<StatusCode, AppError> {
    ensure(&user, Permission::ManageMarketing)?;
    CampaignService::new(state.stores().content.as_ref())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Help articles
// =============================================================================

async fn list_articles(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<HelpArticle>>, AppError> {
    ensure(&user, Permission::ManageContent)?;
    Ok(Json(HelpService::new(state.stores().content.as_ref()).list_all().await?))
}

async fn show_article(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ArticleId>,
) -> Result<Json<HelpArticle>, AppError> {
    ensure(&user, Permission::ManageContent)?;
    Ok(Json(HelpService::new(state.stores().content.as_ref()).get(id).await?))
}

async fn create_article(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(form): Json<HelpArticleForm>,
) -> Result<(StatusCode, Json<HelpArticle>), AppError> {
    ensure(&user, Permission::ManageContent)?;
    let article = HelpService::new(state.stores().content.as_ref())
        .create(form)
        .await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn update_article(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ArticleId>,
    Json(form): Json<HelpArticleForm>,
) -> Result<Json<HelpArticle>, AppError> {
    ensure(&user, Permission::ManageContent)?;
    let article = HelpService::new(state.stores().content.as_ref())
        .update(id, form)
        .await?;
    Ok(Json(article))
}

async fn delete_article(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ArticleId>,
) -> Result<StatusCode, AppError> {
    ensure(&user, Permission::ManageContent)?;
    HelpService::new(state.stores().content.as_ref())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Notification log
// =============================================================================

async fn notification_log(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<NotificationRecord>>, AppError> {
    ensure(&user, Permission::ManageSettings)?;
    let records = NotificationService::from_state(&state)
        .list_notifications(query.limit.unwrap_or(DEFAULT_LOG_LIMIT))
        .await?;
    Ok(Json(records))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id, channel = %body.channel))]
async fn test_notification(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(body): Json<TestNotification>,
) -> Result<Json<NotificationRecord>, AppError> {
    ensure(&user, Permission::ManageSettings)?;
    let record = NotificationService::from_state(&state)
        .send_test_notification(body.channel, &body.recipient)
        .await?;
    Ok(Json(record))
}
