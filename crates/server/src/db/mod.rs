//! Persistence for the store.
//!
//! Each concern has a repository trait with two implementations:
//! [`postgres`] for the running service and [`memory`] for tests and local
//! demos. Handlers and services only see the traits through [`Stores`].
//!
//! # Tables
//!
//! - `categories`, `products`, `product_images` - Catalog
//! - `orders`, `order_items`, `shipping_info`, `delivery_info` - Orders
//! - `order_number_counters` - Daily order number sequence
//! - `users` - Staff and customer accounts
//! - `settings` - Settings documents (JSONB)
//! - `print_jobs`, `scan_history`, `notifications` - Activity logs
//! - `campaigns`, `help_articles` - Content
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p thriftstore-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use thriftstore_core::{
    ArticleId, CampaignId, CategoryId, OrderId, PrintJobId, PrintJobStatus, ProductId,
    ProductStatus, UserId,
};

use crate::models::{
    Campaign, Category, HelpArticle, NewCampaign, NewCategory, NewHelpArticle, NewNotification,
    NewOrder, NewPrintJob, NewProduct, NewScan, NewUser, NotificationRecord, Order, PrintJob,
    Product, ScanRecord, User,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Categories and products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All categories ordered by sort order, then name.
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    /// Fails with `Conflict` when the slug is taken.
    async fn insert_category(&self, category: NewCategory) -> RepoResult<Category>;
    async fn update_category(&self, category: &Category) -> RepoResult<()>;
    async fn delete_category(&self, id: CategoryId) -> RepoResult<()>;

    /// All products, newest first.
    async fn list_products(&self) -> RepoResult<Vec<Product>>;
    async fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>>;
    async fn find_product_by_barcode(&self, barcode: &str) -> RepoResult<Option<Product>>;
    /// Fails with `Conflict` when the barcode is taken.
    async fn insert_product(&self, product: NewProduct) -> RepoResult<Product>;
    /// Replace every editable field, including images.
    async fn update_product(&self, product: &Product) -> RepoResult<()>;
    async fn set_product_status(&self, ids: &[ProductId], status: ProductStatus)
    -> RepoResult<()>;
    async fn delete_product(&self, id: ProductId) -> RepoResult<()>;
}

/// Orders with their items, shipping and delivery details.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Next value of the per-day order counter, starting at 1.
    async fn next_order_sequence(&self, day: NaiveDate) -> RepoResult<i32>;
    /// Insert the order as pending/unpaid and reserve its products.
    ///
    /// Fails with `Conflict` without writing anything when any product is no
    /// longer active.
    async fn insert_order(&self, order: NewOrder) -> RepoResult<Order>;
    async fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>>;
    async fn find_order_by_number(&self, order_number: &str) -> RepoResult<Option<Order>>;
    /// All orders, newest first.
    async fn list_orders(&self) -> RepoResult<Vec<Order>>;
    /// Persist status, payment status, delivery details and `updated_at`.
    async fn save_order_state(&self, order: &Order) -> RepoResult<()>;
    /// Whether any order that is not delivered or cancelled contains the product.
    async fn product_on_open_order(&self, product: ProductId) -> RepoResult<bool>;
}

/// Staff and customer accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// The account and its password hash, for login.
    async fn find_credentials(&self, email: &str) -> RepoResult<Option<(User, String)>>;
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> RepoResult<User>;
    /// Persist name, phone, role and status.
    async fn update_user(&self, user: &User) -> RepoResult<()>;
    async fn delete_user(&self, id: UserId) -> RepoResult<()>;
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> RepoResult<()>;
}

/// JSON settings documents by key.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> RepoResult<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value) -> RepoResult<()>;
    /// Write `value` only if the stored document still equals `expected`
    /// (`None` meaning absent). Returns `false` when another writer got
    /// there first.
    async fn replace(
        &self,
        key: &str,
        expected: Option<&serde_json::Value>,
        value: serde_json::Value,
    ) -> RepoResult<bool>;
}

#[async_trait]
pub trait PrintJobStore: Send + Sync {
    async fn insert_print_job(&self, job: NewPrintJob) -> RepoResult<PrintJob>;
    async fn finish_print_job(
        &self,
        id: PrintJobId,
        status: PrintJobStatus,
        error: Option<String>,
    ) -> RepoResult<PrintJob>;
    /// Most recent first.
    async fn list_print_jobs(&self, limit: usize) -> RepoResult<Vec<PrintJob>>;
}

#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn insert_scan(&self, scan: NewScan) -> RepoResult<ScanRecord>;
    /// The staff member's scans, most recent first.
    async fn list_scans(&self, staff: UserId, limit: usize) -> RepoResult<Vec<ScanRecord>>;
    /// Returns how many records were removed.
    async fn clear_scans(&self, staff: UserId) -> RepoResult<u64>;
    async fn client_ref_exists(&self, client_ref: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> RepoResult<NotificationRecord>;
    /// Most recent first.
    async fn list_notifications(&self, limit: usize) -> RepoResult<Vec<NotificationRecord>>;
}

/// Marketing campaigns and help-center articles.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list_campaigns(&self) -> RepoResult<Vec<Campaign>>;
    async fn get_campaign(&self, id: CampaignId) -> RepoResult<Option<Campaign>>;
    /// Fails with `Conflict` when the discount code is taken.
    async fn insert_campaign(&self, campaign: NewCampaign) -> RepoResult<Campaign>;
    async fn update_campaign(&self, campaign: &Campaign) -> RepoResult<()>;
    async fn delete_campaign(&self, id: CampaignId) -> RepoResult<()>;

    async fn list_articles(&self) -> RepoResult<Vec<HelpArticle>>;
    async fn get_article(&self, id: ArticleId) -> RepoResult<Option<HelpArticle>>;
    async fn find_article_by_slug(&self, slug: &str) -> RepoResult<Option<HelpArticle>>;
    /// Fails with `Conflict` when the slug is taken.
    async fn insert_article(&self, article: NewHelpArticle) -> RepoResult<HelpArticle>;
    async fn update_article(&self, article: &HelpArticle) -> RepoResult<()>;
    async fn delete_article(&self, id: ArticleId) -> RepoResult<()>;
}

/// Every repository the application uses.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
    pub users: Arc<dyn UserStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub print_jobs: Arc<dyn PrintJobStore>,
    pub scans: Arc<dyn ScanStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub content: Arc<dyn ContentStore>,
    pool: Option<PgPool>,
}

impl Stores {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool.clone()));
        Self {
            catalog: store.clone(),
            orders: store.clone(),
            users: store.clone(),
            settings: store.clone(),
            print_jobs: store.clone(),
            scans: store.clone(),
            notifications: store.clone(),
            content: store,
            pool: Some(pool),
        }
    }

    /// Empty in-memory repositories.
    #[must_use]
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            catalog: store.clone(),
            orders: store.clone(),
            users: store.clone(),
            settings: store.clone(),
            print_jobs: store.clone(),
            scans: store.clone(),
            notifications: store.clone(),
            content: store,
            pool: None,
        }
    }

    /// Database connectivity check for readiness probes.
    ///
    /// In-memory stores are always ready.
    pub async fn ping(&self) -> RepoResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").fetch_one(pool).await?;
        }
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
