//! Category and product queries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use thriftstore_core::{CategoryId, ProductId, ProductStatus};

use super::{PgStore, conflict_or_database, parse_column, require_affected};
use crate::db::{CatalogStore, RepoResult, RepositoryError};
use crate::models::{Category, NewCategory, NewProduct, Product};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    slug: String,
    description: Option<String>,
    parent_id: Option<i32>,
    featured: bool,
    sort_order: i32,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            parent_id: row.parent_id.map(CategoryId::new),
            featured: row.featured,
            sort_order: row.sort_order,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: Option<String>,
    price: Decimal,
    original_price: Option<Decimal>,
    category_id: Option<i32>,
    sub_category_id: Option<i32>,
    condition: String,
    barcode: String,
    status: String,
    tags: Vec<String>,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, images: Vec<String>) -> Result<Product, RepositoryError> {
        Ok(Product {
            id: ProductId::new(self.id),
            name: self.name,
            description: self.description,
            price: self.price,
            original_price: self.original_price,
            category_id: self.category_id.map(CategoryId::new),
            sub_category_id: self.sub_category_id.map(CategoryId::new),
            condition: parse_column("product condition", &self.condition)?,
            barcode: self.barcode,
            status: parse_column("product status", &self.status)?,
            tags: self.tags,
            images,
            featured: self.featured,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    product_id: i32,
    url: String,
}

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, parent_id, featured, sort_order, active, created_at";

const PRODUCT_COLUMNS: &str = "id, name, description, price, original_price, category_id, \
     sub_category_id, condition, barcode, status, tags, featured, created_at, updated_at";

impl PgStore {
    async fn images_for(&self, product_ids: &[i32]) -> RepoResult<HashMap<i32, Vec<String>>> {
        let rows = sqlx::query_as::<_, ImageRow>(
            r"
            SELECT product_id, url
            FROM product_images
            WHERE product_id = ANY($1)
            ORDER BY product_id, position
            ",
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut images: HashMap<i32, Vec<String>> = HashMap::new();
        for row in rows {
            images.entry(row.product_id).or_default().push(row.url);
        }
        Ok(images)
    }

    async fn hydrate_products(&self, rows: Vec<ProductRow>) -> RepoResult<Vec<Product>> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut images = self.images_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let product_images = images.remove(&row.id).unwrap_or_default();
                row.into_product(product_images)
            })
            .collect()
    }

    async fn fetch_product(&self, sql: &str, bind: &str) -> RepoResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.hydrate_products(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

async fn replace_images(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: i32,
    images: &[String],
) -> RepoResult<()> {
    sqlx::query("DELETE FROM product_images WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

    if images.is_empty() {
        return Ok(());
    }
    let positions: Vec<i32> = (0..).take(images.len()).collect();
    sqlx::query(
        r"
        INSERT INTO product_images (product_id, url, position)
        SELECT $1, url, position FROM UNNEST($2::TEXT[], $3::INTEGER[]) AS t(url, position)
        ",
    )
    .bind(product_id)
    .bind(images)
    .bind(&positions)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY sort_order, LOWER(name)"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_category(&self, category: NewCategory) -> RepoResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r"
            INSERT INTO categories (name, slug, description, parent_id, featured, sort_order, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id.map(CategoryId::as_i32))
        .bind(category.featured)
        .bind(category.sort_order)
        .bind(category.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "category slug already exists"))?;
        Ok(row.into())
    }

    async fn update_category(&self, category: &Category) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE categories
            SET name = $2, slug = $3, description = $4, parent_id = $5,
                featured = $6, sort_order = $7, active = $8
            WHERE id = $1
            ",
        )
        .bind(category.id.as_i32())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id.map(CategoryId::as_i32))
        .bind(category.featured)
        .bind(category.sort_order)
        .bind(category.active)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "category slug already exists"))?;
        require_affected(result.rows_affected())
    }

    async fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "category is still referenced"))?;
        require_affected(result.rows_affected())
    }

    async fn list_products(&self) -> RepoResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_products(rows).await
    }

    async fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(self.hydrate_products(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_product_by_barcode(&self, barcode: &str) -> RepoResult<Option<Product>> {
        self.fetch_product(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = $1"),
            barcode,
        )
        .await
    }

    async fn insert_product(&self, product: NewProduct) -> RepoResult<Product> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO products (name, description, price, original_price, category_id,
                                  sub_category_id, condition, barcode, status, tags, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.category_id.map(CategoryId::as_i32))
        .bind(product.sub_category_id.map(CategoryId::as_i32))
        .bind(product.condition.as_str())
        .bind(&product.barcode)
        .bind(product.status.as_str())
        .bind(&product.tags)
        .bind(product.featured)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, "barcode already exists"))?;

        replace_images(&mut tx, row.id, &product.images).await?;
        tx.commit().await?;
        row.into_product(product.images)
    }

    async fn update_product(&self, product: &Product) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r"
            UPDATE products
            SET name = $2, description = $3, price = $4, original_price = $5,
                category_id = $6, sub_category_id = $7, condition = $8, barcode = $9,
                status = $10, tags = $11, featured = $12, updated_at = $13
            WHERE id = $1
            ",
        )
        .bind(product.id.as_i32())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.category_id.map(CategoryId::as_i32))
        .bind(product.sub_category_id.map(CategoryId::as_i32))
        .bind(product.condition.as_str())
        .bind(&product.barcode)
        .bind(product.status.as_str())
        .bind(&product.tags)
        .bind(product.featured)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, "barcode already exists"))?;
        require_affected(result.rows_affected())?;

        replace_images(&mut tx, product.id.as_i32(), &product.images).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_product_status(
        &self,
        ids: &[ProductId],
        status: ProductStatus,
    ) -> RepoResult<()> {
        let ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        sqlx::query("UPDATE products SET status = $2, updated_at = NOW() WHERE id = ANY($1)")
            .bind(&ids)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;
        require_affected(result.rows_affected())
    }
}
