//! Products, categories, promotions and help articles for shoppers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::Utc;

use thriftstore_core::{ProductId, ProductStatus};

use crate::error::AppError;
use crate::models::{
    Campaign, CampaignState, Category, HelpArticle, Product, ProductFilter, RenderedArticle,
};
use crate::routes::SearchQuery;
use crate::services::{CampaignService, CatalogService, HelpService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(show_product))
        .route("/categories", get(list_categories))
        .route("/promotions", get(promotions))
        .route("/help", get(list_help))
        .route("/help/{slug}", get(show_help))
}

fn catalog(state: &AppState) -> CatalogService<'_> {
    let stores = state.stores();
    CatalogService::new(stores.catalog.as_ref(), stores.orders.as_ref())
}

/// Active products only, whatever status the query asks for.
async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, AppError> {
    let filter = ProductFilter {
        status: Some(ProductStatus::Active),
        ..filter
    };
    Ok(Json(catalog(&state).list_products(&filter).await?))
}

async fn show_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    let product = catalog(&state).get_product(id).await?;
    if product.status != ProductStatus::Active {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    Ok(Json(product))
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = catalog(&state)
        .list_categories(query.q.as_deref())
        .await?
        .into_iter()
        .filter(|c| c.active)
        .collect();
    Ok(Json(categories))
}

/// Campaigns running now.
async fn promotions(State(state): State<AppState>) -> Result<Json<Vec<Campaign>>, AppError> {
    let campaigns = CampaignService::new(state.stores().content.as_ref())
        .list(Some(CampaignState::Active), Utc::now())
        .await?;
    Ok(Json(campaigns))
}

async fn list_help(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<HelpArticle>>, AppError> {
    let articles = HelpService::new(state.stores().content.as_ref())
        .list_published(query.q.as_deref())
        .await?;
    Ok(Json(articles))
}

async fn show_help(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RenderedArticle>, AppError> {
    let article = HelpService::new(state.stores().content.as_ref())
        .published_article(&slug)
        .await?;
    Ok(Json(article))
}
