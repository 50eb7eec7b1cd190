//! Shipping, tax, payment, notification and store settings.
//!
//! Every save persists immediately.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};

use thriftstore_core::{PaymentMethod, ShippingZoneId, TaxCategoryId};

use crate::error::AppError;
use crate::middleware::{RequireStaff, ensure};
use crate::models::{
    CurrentUser, NotificationSettings, PaymentMethodConfig, PaymentMethodUpdate, Permission,
    ShippingZone, ShippingZoneForm, StoreSettings, TaxCategory, TaxCategoryForm,
};
use crate::routes::SearchQuery;
use crate::services::SettingsService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings/shipping-zones", get(list_zones).post(create_zone))
        .route("/settings/shipping-zones/{id}", put(update_zone).delete(delete_zone))
        .route("/settings/tax-categories", get(list_taxes).post(create_tax))
        .route("/settings/tax-categories/{id}", put(update_tax).delete(delete_tax))
        .route("/settings/payment-methods", get(list_payment_methods))
        .route("/settings/payment-methods/{method}", put(update_payment_method))
        .route(
            "/settings/notifications",
            get(show_notification_settings).put(update_notification_settings),
        )
        .route("/settings/store", get(show_store_settings).put(update_store_settings))
}

/// Settings are admin-only.
fn authorize<'a>(
    state: &'a AppState,
    user: &CurrentUser,
) -> Result<SettingsService<'a>, AppError> {
    ensure(user, Permission::ManageSettings)?;
    Ok(SettingsService::new(state.stores().settings.as_ref()))
}

// =============================================================================
// Shipping zones
// =============================================================================

async fn list_zones(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ShippingZone>>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.shipping_zones(query.q.as_deref()).await?))
}

async fn create_zone(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(form): Json<ShippingZoneForm>,
) -> Result<(StatusCode, Json<ShippingZone>), AppError> {
    let settings = authorize(&state, &user)?;
    Ok((StatusCode::CREATED, Json(settings.create_zone(form).await?)))
}

async fn update_zone(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ShippingZoneId>,
    Json(form): Json<ShippingZoneForm>,
) -> Result<Json<ShippingZone>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.update_zone(id, form).await?))
}

async fn delete_zone(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ShippingZoneId>,
) -> Result<StatusCode, AppError> {
    authorize(&state, &user)?.delete_zone(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Tax categories
// =============================================================================

async fn list_taxes(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<TaxCategory>>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.tax_categories(query.q.as_deref()).await?))
}

async fn create_tax(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(form): Json<TaxCategoryForm>,
) -> Result<(StatusCode, Json<TaxCategory>), AppError> {
    let settings = authorize(&state, &user)?;
    Ok((StatusCode::CREATED, Json(settings.create_tax(form).await?)))
}

async fn update_tax(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TaxCategoryId>,
    Json(form): Json<TaxCategoryForm>,
) -> Result<Json<TaxCategory>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.update_tax(id, form).await?))
}

async fn delete_tax(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TaxCategoryId>,
) -> Result<StatusCode, AppError> {
    authorize(&state, &user)?.delete_tax(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Payment methods
// =============================================================================

async fn list_payment_methods(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentMethodConfig>>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.payment_methods().await?))
}

async fn update_payment_method(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(method): Path<PaymentMethod>,
    Json(update): Json<PaymentMethodUpdate>,
) -> Result<Json<PaymentMethodConfig>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.update_payment_method(method, update).await?))
}

// =============================================================================
// Notifications and store identity
// =============================================================================

async fn show_notification_settings(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<NotificationSettings>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.notification_settings().await?))
}

async fn update_notification_settings(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(body): Json<NotificationSettings>,
) -> Result<Json<NotificationSettings>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.update_notification_settings(body).await?))
}

async fn show_store_settings(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<StoreSettings>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.store_settings().await?))
}

async fn update_store_settings(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(body): Json<StoreSettings>,
) -> Result<Json<StoreSettings>, AppError> {
    let settings = authorize(&state, &user)?;
    Ok(Json(settings.update_store_settings(body).await?))
}
