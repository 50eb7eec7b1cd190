//! Catalog management: categories and one-of-a-kind products.

use rand::Rng;
use rust_decimal::Decimal;
use tracing::instrument;

use thriftstore_core::{CategoryId, ProductId, ProductStatus, round_money};

use super::{non_blank, slugify};
use crate::db::{CatalogStore, OrderStore, RepositoryError};
use crate::error::{AppError, FieldErrors};
use crate::models::{
    Category, CategoryForm, NewCategory, NewProduct, Product, ProductFilter, ProductForm,
    ProductUpdate,
};

/// Prefix reserved by GS1 for in-store numbering.
const IN_STORE_PREFIX: &str = "20";
const MAX_BARCODE_LENGTH: usize = 64;
const BARCODE_ATTEMPTS: usize = 5;

pub struct CatalogService<'a> {
    catalog: &'a dyn CatalogStore,
    orders: &'a dyn OrderStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogStore, orders: &'a dyn OrderStore) -> Self {
        Self { catalog, orders }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Categories ordered by sort order then name, optionally searched.
    pub async fn list_categories(&self, search: Option<&str>) -> Result<Vec<Category>, AppError> {
        let categories = self.catalog.list_categories().await?;
        let Some(q) = non_blank(search).map(|q| q.to_lowercase()) else {
            return Ok(categories);
        };
        Ok(categories
            .into_iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&q)
                    || c.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&q))
            })
            .collect())
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category, AppError> {
        self.catalog
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category {id}")))
    }

    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_category(&self, form: CategoryForm) -> Result<Category, AppError> {
        let (name, slug) = category_name_and_slug(&form.name)?;
        if let Some(parent) = form.parent_id {
            self.get_category(parent)
                .await
                .map_err(|_| AppError::field("parent_id", "parent category does not exist"))?;
        }

        let category = self
            .catalog
            .insert_category(NewCategory {
                name,
                slug,
                description: non_blank(form.description.as_deref()),
                parent_id: form.parent_id,
                featured: form.featured,
                sort_order: form.sort_order,
                active: form.active,
            })
            .await
            .map_err(slug_conflict)?;

        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    #[instrument(skip(self, form))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        form: CategoryForm,
    ) -> Result<Category, AppError> {
        let existing = self.get_category(id).await?;
        let (name, slug) = category_name_and_slug(&form.name)?;

        if let Some(parent) = form.parent_id {
            if parent == id {
                return Err(AppError::field(
                    "parent_id",
                    "a category cannot be its own parent",
                ));
            }
            let categories = self.catalog.list_categories().await?;
            if !categories.iter().any(|c| c.id == parent) {
                return Err(AppError::field("parent_id", "parent category does not exist"));
            }
            if is_ancestor(&categories, id, parent) {
                return Err(AppError::field(
                    "parent_id",
                    "a category cannot be moved under its own descendant",
                ));
            }
        }

        let updated = Category {
            name,
            slug,
            description: non_blank(form.description.as_deref()),
            parent_id: form.parent_id,
            featured: form.featured,
            sort_order: form.sort_order,
            active: form.active,
            ..existing
        };
        self.catalog
            .update_category(&updated)
            .await
            .map_err(slug_conflict)?;
        Ok(updated)
    }

    /// Delete a category nothing references.
    ///
    /// # Errors
    ///
    /// `AppError::Conflict` when a child category or a product still uses
    /// it. Nothing is changed in that case.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), AppError> {
        let category = self.get_category(id).await?;

        let children = self
            .catalog
            .list_categories()
            .await?
            .into_iter()
            .filter(|c| c.parent_id == Some(id))
            .count();
        if children > 0 {
            return Err(AppError::Conflict(format!(
                "'{}' still has {children} sub-categories",
                category.name
            )));
        }

        let products = self
            .catalog
            .list_products()
            .await?
            .into_iter()
            .filter(|p| p.in_category(id))
            .count();
        if products > 0 {
            return Err(AppError::Conflict(format!(
                "'{}' is used by {products} products",
                category.name
            )));
        }

        self.catalog.delete_category(id).await?;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    pub async fn toggle_category_featured(&self, id: CategoryId) -> Result<Category, AppError> {
        let mut category = self.get_category(id).await?;
        category.featured = !category.featured;
        self.catalog.update_category(&category).await?;
        Ok(category)
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        let products = self.catalog.list_products().await?;
        Ok(products.into_iter().filter(|p| filter.matches(p)).collect())
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, AppError> {
        self.catalog
            .get_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))
    }

    pub async fn find_by_barcode(&self, barcode: &str) -> Result<Product, AppError> {
        self.catalog
            .find_product_by_barcode(barcode.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no product with barcode {}", barcode.trim())))
    }

    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_product(&self, form: ProductForm) -> Result<Product, AppError> {
        let mut errors = FieldErrors::new();
        let name = form.name.trim().to_owned();
        if name.is_empty() {
            errors.add("name", "name is required");
        }
        check_prices(&mut errors, form.price, form.original_price);
        self.check_categories(&mut errors, form.category_id, form.sub_category_id)
            .await?;
        let barcode = match non_blank(form.barcode.as_deref()) {
            Some(code) => {
                check_barcode(&mut errors, &code);
                code
            }
            None => self.generate_barcode().await?,
        };
        errors.into_result()?;

        let product = self
            .catalog
            .insert_product(NewProduct {
                name,
                description: non_blank(form.description.as_deref()),
                price: round_money(form.price),
                original_price: form.original_price.map(round_money),
                category_id: form.category_id,
                sub_category_id: form.sub_category_id,
                condition: form.condition,
                barcode,
                status: form.status.unwrap_or(ProductStatus::Draft),
                tags: normalize_tags(&form.tags),
                images: form
                    .images
                    .iter()
                    .filter_map(|url| non_blank(Some(url)))
                    .collect(),
                featured: form.featured,
            })
            .await
            .map_err(barcode_conflict)?;

        tracing::info!(product_id = %product.id, barcode = %product.barcode, "Product created");
        Ok(product)
    }

    /// Apply the fields present in `update`.
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, AppError> {
        let mut product = self.get_product(id).await?;
        let mut errors = FieldErrors::new();

        if let Some(name) = update.name {
            let name = name.trim().to_owned();
            if name.is_empty() {
                errors.add("name", "name is required");
            }
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = non_blank(Some(&description));
        }
        if let Some(price) = update.price {
            product.price = round_money(price);
        }
        if let Some(original) = update.original_price {
            product.original_price = (!original.is_zero()).then(|| round_money(original));
        }
        if update.category_id.is_some() {
            product.category_id = update.category_id;
            product.sub_category_id = update.sub_category_id;
        } else if update.sub_category_id.is_some() {
            product.sub_category_id = update.sub_category_id;
        }
        if let Some(condition) = update.condition {
            product.condition = condition;
        }
        if let Some(barcode) = update.barcode {
            let barcode = barcode.trim().to_owned();
            check_barcode(&mut errors, &barcode);
            product.barcode = barcode;
        }
        if let Some(tags) = update.tags {
            product.tags = normalize_tags(&tags);
        }

        check_prices(&mut errors, product.price, product.original_price);
        self.check_categories(&mut errors, product.category_id, product.sub_category_id)
            .await?;
        errors.into_result()?;

        product.updated_at = chrono::Utc::now();
        self.catalog
            .update_product(&product)
            .await
            .map_err(barcode_conflict)?;
        Ok(product)
    }

    /// Delete a product that is not part of an open order.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AppError> {
        let product = self.get_product(id).await?;
        if self.orders.product_on_open_order(id).await? {
            return Err(AppError::Conflict(format!(
                "'{}' is on an open order",
                product.name
            )));
        }
        self.catalog.delete_product(id).await?;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Set a product's status by hand. Products held by an open order keep
    /// the status the order gave them until it is delivered or cancelled.
    pub async fn set_product_status(
        &self,
        id: ProductId,
        status: ProductStatus,
    ) -> Result<Product, AppError> {
        let product = self.get_product(id).await?;
        if product.status == status {
            return Ok(product);
        }
        if self.orders.product_on_open_order(id).await? {
            return Err(AppError::Conflict(format!(
                "'{}' is on an open order",
                product.name
            )));
        }
        self.catalog.set_product_status(&[id], status).await?;
        Ok(Product { status, ..product })
    }

    pub async fn toggle_product_featured(&self, id: ProductId) -> Result<Product, AppError> {
        let mut product = self.get_product(id).await?;
        product.featured = !product.featured;
        self.catalog.update_product(&product).await?;
        Ok(product)
    }

    pub async fn add_product_image(&self, id: ProductId, url: &str) -> Result<Product, AppError> {
        let url = url::Url::parse(url.trim())
            .map_err(|_| AppError::field("url", "image must be an absolute URL"))?;
        let mut product = self.get_product(id).await?;
        let url = url.to_string();
        if !product.images.contains(&url) {
            product.images.push(url);
            self.catalog.update_product(&product).await?;
        }
        Ok(product)
    }

    pub async fn remove_product_image(
        &self,
        id: ProductId,
        index: usize,
    ) -> Result<Product, AppError> {
        let mut product = self.get_product(id).await?;
        if index >= product.images.len() {
            return Err(AppError::NotFound(format!("image {index} of product {id}")));
        }
        product.images.remove(index);
        self.catalog.update_product(&product).await?;
        Ok(product)
    }

    async fn check_categories(
        &self,
        errors: &mut FieldErrors,
        category: Option<CategoryId>,
        sub_category: Option<CategoryId>,
    ) -> Result<(), AppError> {
        if let Some(id) = category
            && self.catalog.get_category(id).await?.is_none()
        {
            errors.add("category_id", "category does not exist");
        }
        if let Some(id) = sub_category {
            match self.catalog.get_category(id).await? {
                None => errors.add("sub_category_id", "sub-category does not exist"),
                Some(sub) if category.is_none() || sub.parent_id != category => {
                    errors.add(
                        "sub_category_id",
                        "sub-category must belong to the chosen category",
                    );
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    async fn generate_barcode(&self) -> Result<String, AppError> {
        for _ in 0..BARCODE_ATTEMPTS {
            let code = random_ean13(&mut rand::rng());
            if self.catalog.find_product_by_barcode(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(AppError::Internal(
            "could not allocate an unused barcode".to_string(),
        ))
    }
}

fn category_name_and_slug(name: &str) -> Result<(String, String), AppError> {
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(AppError::field("name", "name is required"));
    }
    let slug = slugify(&name);
    if slug.is_empty() {
        return Err(AppError::field("name", "name must contain letters or digits"));
    }
    Ok((name, slug))
}

/// Whether `ancestor` appears on the parent chain of `category`.
fn is_ancestor(categories: &[Category], ancestor: CategoryId, category: CategoryId) -> bool {
    let mut current = Some(category);
    let mut steps = 0;
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        steps += 1;
        if steps > categories.len() {
            return true;
        }
        current = categories
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.parent_id);
    }
    false
}

fn check_prices(errors: &mut FieldErrors, price: Decimal, original: Option<Decimal>) {
    if price <= Decimal::ZERO {
        errors.add("price", "price must be greater than zero");
    }
    if original.is_some_and(|o| o < price) {
        errors.add(
            "original_price",
            "original price cannot be lower than the price",
        );
    }
}

fn check_barcode(errors: &mut FieldErrors, barcode: &str) {
    if barcode.is_empty()
        || barcode.len() > MAX_BARCODE_LENGTH
        || !barcode.chars().all(|c| c.is_ascii_graphic())
    {
        errors.add("barcode", "barcode must be 1-64 printable characters");
    }
}

fn slug_conflict(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::Conflict(_) => {
            AppError::field("name", "a category with this name already exists")
        }
        other => other.into(),
    }
}

fn barcode_conflict(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::Conflict(_) => {
            AppError::field("barcode", "another product already uses this barcode")
        }
        other => other.into(),
    }
}

/// Trimmed, lower-cased, de-duplicated tags in first-seen order.
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

/// A random in-store EAN-13 with a valid check digit.
pub fn random_ean13(rng: &mut impl Rng) -> String {
    let mut code = String::from(IN_STORE_PREFIX);
    for _ in 0..10 {
        code.push(char::from(b'0' + rng.random_range(0..10u8)));
    }
    code.push(char::from(b'0' + ean13_check_digit(&code)));
    code
}

/// Check digit for the first twelve digits of an EAN-13.
fn ean13_check_digit(first_twelve: &str) -> u8 {
    let sum: u32 = first_twelve
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 0 { digit } else { digit * 3 }
        })
        .sum();
    u8::try_from((10 - sum % 10) % 10).unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use thriftstore_core::ProductCondition;

    use super::*;
    use crate::db::MemoryStore;

    fn category(name: &str, parent: Option<CategoryId>) -> CategoryForm {
        CategoryForm {
            name: name.to_owned(),
            description: None,
            parent_id: parent,
            featured: false,
            sort_order: 0,
            active: true,
        }
    }

    fn product(name: &str, price: i64) -> ProductForm {
        ProductForm {
            name: name.to_owned(),
            description: None,
            price: Decimal::new(price, 0),
            original_price: None,
            category_id: None,
            sub_category_id: None,
            condition: ProductCondition::Good,
            barcode: None,
            status: Some(ProductStatus::Active),
            tags: Vec::new(),
            images: Vec::new(),
            featured: false,
        }
    }

    #[test]
    fn test_ean13_check_digit() {
        // 400638133393 -> 1 (4006381333931 is a published example)
        assert_eq!(ean13_check_digit("400638133393"), 1);
        let code = random_ean13(&mut rand::rng());
        assert_eq!(code.len(), 13);
        assert!(code.starts_with(IN_STORE_PREFIX));
        assert_eq!(
            ean13_check_digit(&code[..12]),
            code.as_bytes()[12] - b'0'
        );
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " Vintage ".to_owned(),
            "vintage".to_owned(),
            String::new(),
            "Denim".to_owned(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["vintage", "denim"]);
    }

    #[tokio::test]
    async fn test_delete_parent_with_child_is_conflict_and_list_unchanged() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store, &store);
        let parent = service.create_category(category("Clothing", None)).await.unwrap();
        service
            .create_category(category("Jackets", Some(parent.id)))
            .await
            .unwrap();
        let before = service.list_categories(None).await.unwrap();

        let err = service.delete_category(parent.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(service.list_categories(None).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_category_used_by_product_is_conflict() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store, &store);
        let shoes = service.create_category(category("Shoes", None)).await.unwrap();
        let mut form = product("Sneakers", 900);
        form.category_id = Some(shoes.id);
        service.create_product(form).await.unwrap();

        assert!(matches!(
            service.delete_category(shoes.id).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_featured_flips_one_field_on_one_record() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store, &store);
        let a = service.create_category(category("Bags", None)).await.unwrap();
        let b = service.create_category(category("Books", None)).await.unwrap();

        let toggled = service.toggle_category_featured(a.id).await.unwrap();
        assert_eq!(toggled, Category { featured: true, ..a.clone() });
        assert_eq!(service.get_category(b.id).await.unwrap(), b);

        let first = service.create_product(product("Lamp", 800)).await.unwrap();
        let second = service.create_product(product("Mirror", 1200)).await.unwrap();
        let flipped = service.toggle_product_featured(first.id).await.unwrap();
        assert_eq!(flipped, Product { featured: true, ..first });
        assert_eq!(service.get_product(second.id).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_category_cannot_become_its_own_ancestor() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store, &store);
        let top = service.create_category(category("Home", None)).await.unwrap();
        let mid = service
            .create_category(category("Kitchen", Some(top.id)))
            .await
            .unwrap();

        let err = service
            .update_category(top.id, category("Home", Some(mid.id)))
            .await
            .unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(fields.get("parent_id").is_some());
    }

    #[tokio::test]
    async fn test_duplicate_category_name_is_field_error() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store, &store);
        service.create_category(category("Toys", None)).await.unwrap();
        let AppError::Validation(fields) = service
            .create_category(category("  toys ", None))
            .await
            .unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert!(fields.get("name").is_some());
    }

    #[tokio::test]
    async fn test_create_product_validates_prices_and_sub_category() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store, &store);
        let clothing = service.create_category(category("Clothing", None)).await.unwrap();
        let shoes = service.create_category(category("Shoes", None)).await.unwrap();
        let boots = service
            .create_category(category("Boots", Some(shoes.id)))
            .await
            .unwrap();

        let mut form = product("Boots", 0);
        form.original_price = Some(Decimal::new(-5, 0));
        form.category_id = Some(clothing.id);
        form.sub_category_id = Some(boots.id);
        let AppError::Validation(fields) = service.create_product(form).await.unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(fields.get("price").is_some());
        assert!(fields.get("original_price").is_some());
        assert!(fields.get("sub_category_id").is_some());
    }

    #[tokio::test]
    async fn test_create_product_generates_barcode_and_normalizes_tags() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store, &store);
        let mut form = product("Kitenge Dress", 1800);
        form.tags = vec!["Kitenge".to_owned(), " kitenge".to_owned()];
        let created = service.create_product(form).await.unwrap();

        assert_eq!(created.barcode.len(), 13);
        assert_eq!(created.tags, vec!["kitenge"]);
        assert_eq!(
            service.find_by_barcode(&created.barcode).await.unwrap().id,
            created.id
        );
    }

    #[tokio::test]
    async fn test_partial_update_keeps_untouched_fields() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store, &store);
        let created = service.create_product(product("Radio", 2500)).await.unwrap();

        let updated = service
            .update_product(
                created.id,
                ProductUpdate {
                    price: Some(Decimal::new(2000, 0)),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Decimal::new(2000, 0));
        assert_eq!(updated.name, "Radio");
        assert_eq!(updated.barcode, created.barcode);
    }

    #[tokio::test]
    async fn test_images_add_and_remove() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store, &store);
        let created = service.create_product(product("Vase", 600)).await.unwrap();

        assert!(matches!(
            service.add_product_image(created.id, "not a url").await,
            Err(AppError::Validation(_))
        ));
        let with_image = service
            .add_product_image(created.id, "https://img.example.com/vase.jpg")
            .await
            .unwrap();
        assert_eq!(with_image.images.len(), 1);
        let without = service.remove_product_image(created.id, 0).await.unwrap();
        assert!(without.images.is_empty());
        assert!(matches!(
            service.remove_product_image(created.id, 0).await,
            Err(AppError::NotFound(_))
        ));
    }
}
