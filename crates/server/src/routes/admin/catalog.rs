//! Category and product management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;
use tracing::instrument;

use thriftstore_core::{CategoryId, ProductId, ProductStatus};

use crate::error::AppError;
use crate::middleware::{RequireStaff, ensure};
use crate::models::{
    Category, CategoryForm, Permission, Product, ProductFilter, ProductForm, ProductUpdate,
};
use crate::routes::SearchQuery;
use crate::services::CatalogService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(show_category).put(update_category).delete(delete_category),
        )
        .route("/categories/{id}/featured", post(toggle_category_featured))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(show_product).patch(update_product).delete(delete_product),
        )
        .route("/products/{id}/status", post(set_product_status))
        .route("/products/{id}/featured", post(toggle_product_featured))
        .route("/products/{id}/images", post(add_image))
        .route("/products/{id}/images/{index}", delete(remove_image))
}

fn service(state: &AppState) -> CatalogService<'_> {
    let stores = state.stores();
    CatalogService::new(stores.catalog.as_ref(), stores.orders.as_ref())
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: ProductStatus,
}

#[derive(Debug, Deserialize)]
pub struct ImageInput {
    pub url: String,
}

// =============================================================================
// Categories
// =============================================================================

async fn list_categories(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(service(&state).list_categories(query.q.as_deref()).await?))
}

async fn show_category(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(service(&state).get_category(id).await?))
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
async fn create_category(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    let category = service(&state).create_category(form).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<Category>, AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    Ok(Json(service(&state).update_category(id, form).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn delete_category(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    service(&state).delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_category_featured(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    Ok(Json(service(&state).toggle_category_featured(id).await?))
}

// =============================================================================
// Products
// =============================================================================

async fn list_products(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(service(&state).list_products(&filter).await?))
}

async fn show_product(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(service(&state).get_product(id).await?))
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
async fn create_product(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    let product = service(&state).create_product(form).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>, AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    Ok(Json(service(&state).update_product(id, update).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn delete_product(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    service(&state).delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_product_status(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<StatusInput>,
) -> Result<Json<Product>, AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    Ok(Json(service(&state).set_product_status(id, input.status).await?))
}

async fn toggle_product_featured(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    Ok(Json(service(&state).toggle_product_featured(id).await?))
}

async fn add_image(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<ImageInput>,
) -> Result<Json<Product>, AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    Ok(Json(service(&state).add_product_image(id, &input.url).await?))
}

async fn remove_image(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path((id, index)): Path<(ProductId, usize)>,
) -> Result<Json<Product>, AppError> {
    ensure(&user, Permission::ManageCatalog)?;
    Ok(Json(service(&state).remove_product_image(id, index).await?))
}
