//! Seed the database from a YAML file.
//!
//! Records go through the same services as the API, so a seed file is
//! validated exactly like back office input. Seeding is repeatable:
//! categories are matched by name, products by barcode and staff by email,
//! and existing records are left alone.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use thriftstore_core::{CategoryId, ProductCondition, ProductStatus, UserRole};
use thriftstore_server::db::Stores;
use thriftstore_server::error::AppError;
use thriftstore_server::models::{CategoryForm, HelpArticleForm, ProductForm, UserForm};
use thriftstore_server::services::{CatalogService, HelpService, UserService};

use super::{ConnectError, connect};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    #[error("{context}: {source}")]
    Rejected {
        context: String,
        #[source]
        source: AppError,
    },
}

/// Top-level layout of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub categories: Vec<SeedCategory>,
    pub products: Vec<SeedProduct>,
    pub help_articles: Vec<SeedArticle>,
    pub staff: Vec<SeedStaff>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub children: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    pub condition: ProductCondition,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sub_category: Option<String>,
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

#[derive(Debug, Deserialize)]
pub struct SeedArticle {
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    pub body_markdown: String,
    #[serde(default = "published_by_default")]
    pub published: bool,
}

const fn published_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SeedStaff {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub password: String,
}

/// Counts of what a seed run created and skipped.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub created: usize,
    pub skipped: usize,
}

impl fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} created, {} already present", self.created, self.skipped)
    }
}

/// Parse `path` and load it into the database.
pub async fn from_file(path: &str) -> Result<SeedSummary, SeedError> {
    let content = tokio::fs::read_to_string(Path::new(path)).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    tracing::info!(
        path,
        categories = seed.categories.len(),
        products = seed.products.len(),
        articles = seed.help_articles.len(),
        staff = seed.staff.len(),
        "Parsed seed file"
    );

    let stores = Stores::postgres(connect().await?);
    apply(&stores, seed).await
}

/// Load a parsed seed file into `stores`.
pub async fn apply(stores: &Stores, seed: SeedFile) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();
    let catalog = CatalogService::new(stores.catalog.as_ref(), stores.orders.as_ref());

    let mut categories: HashMap<String, CategoryId> = catalog
        .list_categories(None)
        .await
        .map_err(|e| rejected("listing categories", e))?
        .into_iter()
        .map(|c| (c.name.to_lowercase(), c.id))
        .collect();

    // Parents before children so every parent ID is known.
    let mut pending: Vec<(Option<CategoryId>, SeedCategory)> =
        seed.categories.into_iter().map(|c| (None, c)).collect();
    while let Some((parent_id, category)) = pending.pop() {
        let key = category.name.to_lowercase();
        let id = if let Some(id) = categories.get(&key) {
            summary.skipped += 1;
            *id
        } else {
            let created = catalog
                .create_category(CategoryForm {
                    name: category.name.clone(),
                    description: category.description,
                    parent_id,
                    featured: category.featured,
                    sort_order: 0,
                    active: true,
                })
                .await
                .map_err(|e| rejected(&format!("category '{}'", category.name), e))?;
            summary.created += 1;
            categories.insert(key, created.id);
            created.id
        };
        pending.extend(category.children.into_iter().map(|c| (Some(id), c)));
    }

    let lookup = |name: Option<&String>| -> Result<Option<CategoryId>, SeedError> {
        name.map(|n| {
            categories
                .get(&n.to_lowercase())
                .copied()
                .ok_or_else(|| SeedError::UnknownCategory(n.clone()))
        })
        .transpose()
    };

    for product in seed.products {
        if let Some(barcode) = &product.barcode
            && catalog.find_by_barcode(barcode).await.is_ok()
        {
            summary.skipped += 1;
            continue;
        }
        let form = ProductForm {
            category_id: lookup(product.category.as_ref())?,
            sub_category_id: lookup(product.sub_category.as_ref())?,
            name: product.name,
            description: product.description,
            price: product.price,
            original_price: product.original_price,
            condition: product.condition,
            barcode: product.barcode,
            status: product.status,
            tags: product.tags,
            images: product.images,
            featured: product.featured,
        };
        let context = format!("product '{}'", form.name);
        catalog
            .create_product(form)
            .await
            .map_err(|e| rejected(&context, e))?;
        summary.created += 1;
    }

    let help = HelpService::new(stores.content.as_ref());
    let existing_titles: Vec<String> = help
        .list_all()
        .await
        .map_err(|e| rejected("listing help articles", e))?
        .into_iter()
        .map(|a| a.title.to_lowercase())
        .collect();
    for article in seed.help_articles {
        if existing_titles.contains(&article.title.to_lowercase()) {
            summary.skipped += 1;
            continue;
        }
        let context = format!("help article '{}'", article.title);
        help.create(HelpArticleForm {
            title: article.title,
            category: article.category.unwrap_or_else(|| "General".to_owned()),
            body_markdown: article.body_markdown,
            published: article.published,
        })
        .await
        .map_err(|e| rejected(&context, e))?;
        summary.created += 1;
    }

    let users = UserService::new(stores.users.as_ref(), stores.orders.as_ref());
    for staff in seed.staff {
        let context = format!("staff '{}'", staff.email);
        match users
            .create_staff(UserForm {
                name: staff.name,
                email: staff.email,
                phone: None,
                password: staff.password,
                role: staff.role,
            })
            .await
        {
            Ok(_) => summary.created += 1,
            Err(AppError::Validation(fields))
                if fields.get("email").is_some_and(|m| m.contains("already")) =>
            {
                summary.skipped += 1;
            }
            Err(e) => return Err(rejected(&context, e)),
        }
    }

    Ok(summary)
}

fn rejected(context: &str, source: AppError) -> SeedError {
    SeedError::Rejected {
        context: context.to_owned(),
        source,
    }
}
