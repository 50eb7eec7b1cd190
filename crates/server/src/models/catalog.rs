//! Catalog domain types: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use thriftstore_core::{CategoryId, ProductCondition, ProductId, ProductStatus};

/// A product category. Categories form a tree through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub featured: bool,
    pub sort_order: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Validated values for inserting a category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub featured: bool,
    pub sort_order: i32,
    pub active: bool,
}

/// Create/edit form for a category. Edits replace every field.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

const fn default_true() -> bool {
    true
}

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Retail price when new, shown struck through next to `price`.
    pub original_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub sub_category_id: Option<CategoryId>,
    pub condition: ProductCondition,
    pub barcode: String,
    pub status: ProductStatus,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether a shopper can put the item in a cart.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Percentage saved against the original price, rounded down.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price?;
        if original <= self.price || original.is_zero() {
            return None;
        }
        let percent = (original - self.price) * Decimal::ONE_HUNDRED / original;
        percent.floor().to_u32()
    }

    /// Whether the item belongs to `category` directly or as a sub-category.
    #[must_use]
    pub fn in_category(&self, category: CategoryId) -> bool {
        self.category_id == Some(category) || self.sub_category_id == Some(category)
    }
}

/// Validated values for inserting a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub sub_category_id: Option<CategoryId>,
    pub condition: ProductCondition,
    pub barcode: String,
    pub status: ProductStatus,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub featured: bool,
}

/// Staff upload form for a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub sub_category_id: Option<CategoryId>,
    pub condition: ProductCondition,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

/// Partial product edit. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub sub_category_id: Option<CategoryId>,
    pub condition: Option<ProductCondition>,
    pub barcode: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Query parameters for product listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Free-text search over name, description, tags and barcode.
    pub q: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: Option<ProductStatus>,
    pub condition: Option<ProductCondition>,
    pub featured: Option<bool>,
}

impl ProductFilter {
    /// Whether `product` passes every filter that is set.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category_id
            && !product.in_category(category)
        {
            return false;
        }
        if self.status.is_some_and(|s| s != product.status) {
            return false;
        }
        if self.condition.is_some_and(|c| c != product.condition) {
            return false;
        }
        if self.featured.is_some_and(|f| f != product.featured) {
            return false;
        }
        match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                product.name.to_lowercase().contains(&q)
                    || product
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&q))
                    || product.tags.iter().any(|t| t.contains(&q))
                    || product.barcode.to_lowercase() == q
            }
            _ => true,
        }
    }
}
