//! In-memory repositories.
//!
//! Every table lives behind one lock so multi-table writes (placing an order
//! reserves its products) are atomic, matching the transactional behaviour
//! of the `PostgreSQL` implementation.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use thriftstore_core::{
    ArticleId, CampaignId, CategoryId, NotificationId, OrderId, OrderStatus, PaymentStatus,
    PrintJobId, PrintJobStatus, ProductId, ProductStatus, ScanId, UserId,
};

use super::{
    CatalogStore, ContentStore, NotificationStore, OrderStore, PrintJobStore, RepoResult,
    RepositoryError, ScanStore, SettingsStore, UserStore,
};
use crate::models::{
    Campaign, Category, HelpArticle, NewCampaign, NewCategory, NewHelpArticle, NewNotification,
    NewOrder, NewPrintJob, NewProduct, NewScan, NewUser, NotificationRecord, Order, PrintJob,
    Product, ScanRecord, User,
};

#[derive(Default)]
struct Tables {
    next_id: i32,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    order_counters: HashMap<NaiveDate, i32>,
    users: BTreeMap<UserId, (User, String)>,
    settings: HashMap<String, serde_json::Value>,
    print_jobs: BTreeMap<PrintJobId, PrintJob>,
    scans: BTreeMap<ScanId, ScanRecord>,
    notifications: BTreeMap<NotificationId, NotificationRecord>,
    campaigns: BTreeMap<CampaignId, Campaign>,
    articles: BTreeMap<ArticleId, HelpArticle>,
}

impl Tables {
    /// IDs are unique across tables, which keeps test fixtures unambiguous.
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Repositories held in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Clone>(
    rows: impl Iterator<Item = T>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.reverse();
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(categories)
    }

    async fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn insert_category(&self, category: NewCategory) -> RepoResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.slug == category.slug) {
            return Err(RepositoryError::Conflict(format!(
                "category slug '{}' already exists",
                category.slug
            )));
        }
        let id = CategoryId::new(tables.allocate_id());
        let created = Category {
            id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            parent_id: category.parent_id,
            featured: category.featured,
            sort_order: category.sort_order,
            active: category.active,
            created_at: Utc::now(),
        };
        tables.categories.insert(id, created.clone());
        Ok(created)
    }

    async fn update_category(&self, category: &Category) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .categories
            .values()
            .any(|c| c.id != category.id && c.slug == category.slug)
        {
            return Err(RepositoryError::Conflict(format!(
                "category slug '{}' already exists",
                category.slug
            )));
        }
        let existing = tables
            .categories
            .get_mut(&category.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = category.clone();
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_products(&self) -> RepoResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.products.values().cloned(), |p| {
            p.created_at
        }))
    }

    async fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn find_product_by_barcode(&self, barcode: &str) -> RepoResult<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .find(|p| p.barcode == barcode)
            .cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> RepoResult<Product> {
        let mut tables = self.tables.write().await;
        if tables.products.values().any(|p| p.barcode == product.barcode) {
            return Err(RepositoryError::Conflict(format!(
                "barcode {} already exists",
                product.barcode
            )));
        }
        let id = ProductId::new(tables.allocate_id());
        let now = Utc::now();
        let created = Product {
            id,
            name: product.name,
            description: product.description,
            price: product.price,
            original_price: product.original_price,
            category_id: product.category_id,
            sub_category_id: product.sub_category_id,
            condition: product.condition,
            barcode: product.barcode,
            status: product.status,
            tags: product.tags,
            images: product.images,
            featured: product.featured,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(id, created.clone());
        Ok(created)
    }

    async fn update_product(&self, product: &Product) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .products
            .values()
            .any(|p| p.id != product.id && p.barcode == product.barcode)
        {
            return Err(RepositoryError::Conflict(format!(
                "barcode {} already exists",
                product.barcode
            )));
        }
        let existing = tables
            .products
            .get_mut(&product.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = product.clone();
        Ok(())
    }

    async fn set_product_status(
        &self,
        ids: &[ProductId],
        status: ProductStatus,
    ) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        for id in ids {
            if let Some(product) = tables.products.get_mut(id) {
                product.status = status;
                product.updated_at = now;
            }
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn next_order_sequence(&self, day: NaiveDate) -> RepoResult<i32> {
        let mut tables = self.tables.write().await;
        let counter = tables.order_counters.entry(day).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_order(&self, order: NewOrder) -> RepoResult<Order> {
        let mut tables = self.tables.write().await;
        for item in &order.items {
            let available = tables
                .products
                .get(&item.product_id)
                .is_some_and(Product::is_available);
            if !available {
                return Err(RepositoryError::Conflict(format!(
                    "{} is no longer available",
                    item.name
                )));
            }
        }

        let now = Utc::now();
        for item in &order.items {
            if let Some(product) = tables.products.get_mut(&item.product_id) {
                product.status = ProductStatus::Reserved;
                product.updated_at = now;
            }
        }

        let id = OrderId::new(tables.allocate_id());
        let created = Order {
            id,
            order_number: order.order_number,
            customer_id: order.customer_id,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: order.payment_method,
            items: order.items,
            subtotal: order.subtotal,
            shipping_fee: order.shipping_fee,
            tax: order.tax,
            tax_inclusive: order.tax_inclusive,
            total: order.total,
            shipping: order.shipping,
            delivery: None,
            notes: order.notes,
            created_at: now,
            updated_at: now,
        };
        tables.orders.insert(id, created.clone());
        Ok(created)
    }

    async fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn find_order_by_number(&self, order_number: &str) -> RepoResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .find(|o| o.order_number.eq_ignore_ascii_case(order_number))
            .cloned())
    }

    async fn list_orders(&self) -> RepoResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.orders.values().cloned(), |o| o.created_at))
    }

    async fn save_order_state(&self, order: &Order) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .orders
            .get_mut(&order.id)
            .ok_or(RepositoryError::NotFound)?;
        existing.status = order.status;
        existing.payment_status = order.payment_status;
        existing.delivery.clone_from(&order.delivery);
        existing.updated_at = order.updated_at;
        Ok(())
    }

    async fn product_on_open_order(&self, product: ProductId) -> RepoResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .any(|o| !o.status.is_terminal() && o.product_ids().any(|id| id == product)))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().map(|(u, _)| u.clone()).collect();
        users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(users)
    }

    async fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .get(&id)
            .map(|(u, _)| u.clone()))
    }

    async fn find_credentials(&self, email: &str) -> RepoResult<Option<(User, String)>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|(u, _)| u.email.as_str().eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        let id = UserId::new(tables.allocate_id());
        let created = User {
            id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            status: user.status,
            created_at: Utc::now(),
            last_login_at: None,
        };
        tables
            .users
            .insert(id, (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn update_user(&self, user: &User) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        let (existing, _) = tables
            .users
            .get_mut(&user.id)
            .ok_or(RepositoryError::NotFound)?;
        existing.name.clone_from(&user.name);
        existing.phone.clone_from(&user.phone);
        existing.role = user.role;
        existing.status = user.status;
        Ok(())
    }

    /// Mirrors the foreign keys on `users`: delivery assignments restrict,
    /// orders keep their customer details, scans go with the user.
    async fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .orders
            .values()
            .any(|o| o.delivery.as_ref().is_some_and(|d| d.staff_id == id))
        {
            return Err(RepositoryError::Conflict(
                "user still has assigned deliveries".to_owned(),
            ));
        }
        for order in tables.orders.values_mut() {
            if order.customer_id == Some(id) {
                order.customer_id = None;
            }
        }
        tables.scans.retain(|_, s| s.staff_id != id);
        tables.users.remove(&id);
        Ok(())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        let (user, _) = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.last_login_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> RepoResult<Option<serde_json::Value>> {
        Ok(self.tables.read().await.settings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> RepoResult<()> {
        self.tables
            .write()
            .await
            .settings
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn replace(
        &self,
        key: &str,
        expected: Option<&serde_json::Value>,
        value: serde_json::Value,
    ) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.settings.get(key) != expected {
            return Ok(false);
        }
        tables.settings.insert(key.to_owned(), value);
        Ok(true)
    }
}

#[async_trait]
impl PrintJobStore for MemoryStore {
    async fn insert_print_job(&self, job: NewPrintJob) -> RepoResult<PrintJob> {
        let mut tables = self.tables.write().await;
        let id = PrintJobId::new(tables.allocate_id());
        let created = PrintJob {
            id,
            document: job.document,
            target_id: job.target_id,
            output: job.output,
            copies: job.copies,
            status: PrintJobStatus::Queued,
            printer_name: job.printer_name,
            error: None,
            requested_by: job.requested_by,
            created_at: Utc::now(),
            completed_at: None,
        };
        tables.print_jobs.insert(id, created.clone());
        Ok(created)
    }

    async fn finish_print_job(
        &self,
        id: PrintJobId,
        status: PrintJobStatus,
        error: Option<String>,
    ) -> RepoResult<PrintJob> {
        let mut tables = self.tables.write().await;
        let job = tables
            .print_jobs
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        job.status = status;
        job.error = error;
        job.completed_at = Some(Utc::now());
        Ok(job.clone())
    }

    async fn list_print_jobs(&self, limit: usize) -> RepoResult<Vec<PrintJob>> {
        let tables = self.tables.read().await;
        let mut jobs = newest_first(tables.print_jobs.values().cloned(), |j| j.created_at);
        jobs.truncate(limit);
        Ok(jobs)
    }
}

#[async_trait]
impl ScanStore for MemoryStore {
    async fn insert_scan(&self, scan: NewScan) -> RepoResult<ScanRecord> {
        let mut tables = self.tables.write().await;
        if let Some(client_ref) = scan.client_ref.as_deref()
            && tables
                .scans
                .values()
                .any(|s| s.client_ref.as_deref() == Some(client_ref))
        {
            return Err(RepositoryError::Conflict(format!(
                "scan {client_ref} already recorded"
            )));
        }
        let id = ScanId::new(tables.allocate_id());
        let created = ScanRecord {
            id,
            code: scan.code,
            product_id: scan.product_id,
            staff_id: scan.staff_id,
            scanned_at: scan.scanned_at,
            client_ref: scan.client_ref,
        };
        tables.scans.insert(id, created.clone());
        Ok(created)
    }

    async fn list_scans(&self, staff: UserId, limit: usize) -> RepoResult<Vec<ScanRecord>> {
        let tables = self.tables.read().await;
        let mut scans = newest_first(
            tables.scans.values().filter(|s| s.staff_id == staff).cloned(),
            |s| s.scanned_at,
        );
        scans.truncate(limit);
        Ok(scans)
    }

    async fn clear_scans(&self, staff: UserId) -> RepoResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.scans.len();
        tables.scans.retain(|_, s| s.staff_id != staff);
        Ok((before - tables.scans.len()) as u64)
    }

    async fn client_ref_exists(&self, client_ref: &str) -> RepoResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .scans
            .values()
            .any(|s| s.client_ref.as_deref() == Some(client_ref)))
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> RepoResult<NotificationRecord> {
        let mut tables = self.tables.write().await;
        let id = NotificationId::new(tables.allocate_id());
        let created = NotificationRecord {
            id,
            order_id: notification.order_id,
            event: notification.event,
            channel: notification.channel,
            recipient: notification.recipient,
            message: notification.message,
            outcome: notification.outcome,
            error: notification.error,
            created_at: Utc::now(),
        };
        tables.notifications.insert(id, created.clone());
        Ok(created)
    }

    async fn list_notifications(&self, limit: usize) -> RepoResult<Vec<NotificationRecord>> {
        let tables = self.tables.read().await;
        let mut records =
            newest_first(tables.notifications.values().cloned(), |n| n.created_at);
        records.truncate(limit);
        Ok(records)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_campaigns(&self) -> RepoResult<Vec<Campaign>> {
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables.campaigns.values().cloned().collect();
        campaigns.sort_by_key(|c| std::cmp::Reverse(c.starts_at));
        Ok(campaigns)
    }

    async fn get_campaign(&self, id: CampaignId) -> RepoResult<Option<Campaign>> {
        Ok(self.tables.read().await.campaigns.get(&id).cloned())
    }

    async fn insert_campaign(&self, campaign: NewCampaign) -> RepoResult<Campaign> {
        let mut tables = self.tables.write().await;
        if let Some(code) = campaign.discount_code.as_deref()
            && tables
                .campaigns
                .values()
                .any(|c| c.discount_code.as_deref() == Some(code))
        {
            return Err(RepositoryError::Conflict(format!(
                "discount code {code} already exists"
            )));
        }
        let id = CampaignId::new(tables.allocate_id());
        let created = Campaign {
            id,
            name: campaign.name,
            channel: campaign.channel,
            discount_code: campaign.discount_code,
            discount_percent: campaign.discount_percent,
            message: campaign.message,
            starts_at: campaign.starts_at,
            ends_at: campaign.ends_at,
            created_at: Utc::now(),
        };
        tables.campaigns.insert(id, created.clone());
        Ok(created)
    }

    async fn update_campaign(&self, campaign: &Campaign) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(code) = campaign.discount_code.as_deref()
            && tables
                .campaigns
                .values()
                .any(|c| c.id != campaign.id && c.discount_code.as_deref() == Some(code))
        {
            return Err(RepositoryError::Conflict(format!(
                "discount code {code} already exists"
            )));
        }
        let existing = tables
            .campaigns
            .get_mut(&campaign.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = campaign.clone();
        Ok(())
    }

    async fn delete_campaign(&self, id: CampaignId) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .campaigns
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_articles(&self) -> RepoResult<Vec<HelpArticle>> {
        let tables = self.tables.read().await;
        let mut articles: Vec<HelpArticle> = tables.articles.values().cloned().collect();
        articles.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(articles)
    }

    async fn get_article(&self, id: ArticleId) -> RepoResult<Option<HelpArticle>> {
        Ok(self.tables.read().await.articles.get(&id).cloned())
    }

    async fn find_article_by_slug(&self, slug: &str) -> RepoResult<Option<HelpArticle>> {
        let tables = self.tables.read().await;
        Ok(tables.articles.values().find(|a| a.slug == slug).cloned())
    }

    async fn insert_article(&self, article: NewHelpArticle) -> RepoResult<HelpArticle> {
        let mut tables = self.tables.write().await;
        if tables.articles.values().any(|a| a.slug == article.slug) {
            return Err(RepositoryError::Conflict(format!(
                "article slug '{}' already exists",
                article.slug
            )));
        }
        let id = ArticleId::new(tables.allocate_id());
        let created = HelpArticle {
            id,
            title: article.title,
            slug: article.slug,
            category: article.category,
            body_markdown: article.body_markdown,
            published: article.published,
            updated_at: Utc::now(),
        };
        tables.articles.insert(id, created.clone());
        Ok(created)
    }

    async fn update_article(&self, article: &HelpArticle) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .articles
            .values()
            .any(|a| a.id != article.id && a.slug == article.slug)
        {
            return Err(RepositoryError::Conflict(format!(
                "article slug '{}' already exists",
                article.slug
            )));
        }
        let existing = tables
            .articles
            .get_mut(&article.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = article.clone();
        Ok(())
    }

    async fn delete_article(&self, id: ArticleId) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .articles
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use thriftstore_core::{
        AccountStatus, DeliveryStatus, Email, PaymentMethod, PhoneNumber, ProductCondition,
        UserRole,
    };

    use super::*;
    use crate::models::{DeliveryInfo, OrderItem, ShippingInfo};

    fn new_user(email: &str, role: UserRole) -> NewUser {
        NewUser {
            name: "Kamau".to_owned(),
            email: Email::parse(email).unwrap(),
            phone: None,
            role,
            status: AccountStatus::Active,
            password_hash: "hash".to_owned(),
        }
    }

    fn new_product(barcode: &str) -> NewProduct {
        NewProduct {
            name: "Linen Shirt".to_owned(),
            description: None,
            price: Decimal::new(800, 0),
            original_price: None,
            category_id: None,
            sub_category_id: None,
            condition: ProductCondition::Good,
            barcode: barcode.to_owned(),
            status: ProductStatus::Active,
            tags: Vec::new(),
            images: Vec::new(),
            featured: false,
        }
    }

    fn new_order(product: &Product) -> NewOrder {
        let phone = PhoneNumber::parse("+254712345678").unwrap();
        NewOrder {
            order_number: "TS-20260101-0001".to_owned(),
            customer_id: None,
            customer_name: "Wanjiru".to_owned(),
            customer_email: Email::parse("wanjiru@mail.co.ke").unwrap(),
            customer_phone: phone.clone(),
            payment_method: PaymentMethod::Mpesa,
            items: vec![OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity: 1,
            }],
            subtotal: product.price,
            shipping_fee: Decimal::ZERO,
            tax: Decimal::ZERO,
            tax_inclusive: false,
            total: product.price,
            shipping: ShippingInfo {
                recipient_name: "Wanjiru".to_owned(),
                phone,
                address_line: "12 Moi Avenue".to_owned(),
                city: "Nairobi".to_owned(),
                region: "Nairobi".to_owned(),
                postal_code: None,
                zone_id: None,
                instructions: None,
            },
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_barcode_conflicts() {
        let store = MemoryStore::new();
        store.insert_product(new_product("2000000000015")).await.unwrap();
        let err = store
            .insert_product(new_product("2000000000015"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_insert_order_reserves_products_once() {
        let store = MemoryStore::new();
        let product = store.insert_product(new_product("2000000000015")).await.unwrap();

        let order = store.insert_order(new_order(&product)).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        let reserved = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(reserved.status, ProductStatus::Reserved);

        let err = store.insert_order(new_order(&product)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.list_orders().await.unwrap().len(), 1);
        assert!(store.product_on_open_order(product.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_order_sequence_is_per_day() {
        let store = MemoryStore::new();
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let next_day = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(store.next_order_sequence(day).await.unwrap(), 1);
        assert_eq!(store.next_order_sequence(day).await.unwrap(), 2);
        assert_eq!(store.next_order_sequence(next_day).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_user_follows_foreign_keys() {
        let store = MemoryStore::new();
        let rider = store
            .insert_user(new_user("rider@shop.co.ke", UserRole::DeliveryStaff))
            .await
            .unwrap();
        let buyer = store
            .insert_user(new_user("buyer@mail.co.ke", UserRole::Customer))
            .await
            .unwrap();
        let product = store.insert_product(new_product("2000000000015")).await.unwrap();
        let mut order = store
            .insert_order(NewOrder {
                customer_id: Some(buyer.id),
                ..new_order(&product)
            })
            .await
            .unwrap();
        order.delivery = Some(DeliveryInfo {
            staff_id: rider.id,
            staff_name: rider.name.clone(),
            status: DeliveryStatus::Completed,
            assigned_at: Utc::now(),
            started_at: None,
            completed_at: None,
            notes: None,
        });
        store.save_order_state(&order).await.unwrap();

        let err = store.delete_user(rider.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(store.get_user(rider.id).await.unwrap().is_some());

        store.delete_user(buyer.id).await.unwrap();
        let order = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(order.customer_id, None);
        assert_eq!(order.customer_name, "Wanjiru");
    }
}
