//! Order queries.
//!
//! An order spans `orders`, `order_items`, `shipping_info` and the optional
//! `delivery_info`; writes touching more than one table run in a transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use thriftstore_core::{
    Email, OrderId, OrderStatus, PhoneNumber, ProductId, ProductStatus, ShippingZoneId, UserId,
};

use super::{PgStore, conflict_or_database, parse_column, require_affected};
use crate::db::{OrderStore, RepoResult, RepositoryError};
use crate::models::{DeliveryInfo, NewOrder, Order, OrderItem, ShippingInfo};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    customer_id: Option<i32>,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    status: String,
    payment_status: String,
    payment_method: String,
    subtotal: Decimal,
    shipping_fee: Decimal,
    tax: Decimal,
    tax_inclusive: bool,
    total: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    recipient_name: String,
    shipping_phone: String,
    address_line: String,
    city: String,
    region: String,
    postal_code: Option<String>,
    zone_id: Option<i32>,
    instructions: Option<String>,
    staff_id: Option<i32>,
    staff_name: Option<String>,
    delivery_status: Option<String>,
    assigned_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    delivery_notes: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    product_id: i32,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

fn parse_phone(value: &str) -> Result<PhoneNumber, RepositoryError> {
    PhoneNumber::parse(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid phone in database: {e}")))
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let customer_email = Email::parse(&self.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let delivery = match (self.staff_id, self.staff_name, self.delivery_status, self.assigned_at) {
            (Some(staff_id), Some(staff_name), Some(status), Some(assigned_at)) => {
                Some(DeliveryInfo {
                    staff_id: UserId::new(staff_id),
                    staff_name,
                    status: parse_column("delivery status", &status)?,
                    assigned_at,
                    started_at: self.started_at,
                    completed_at: self.completed_at,
                    notes: self.delivery_notes,
                })
            }
            _ => None,
        };

        Ok(Order {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            customer_id: self.customer_id.map(UserId::new),
            customer_name: self.customer_name,
            customer_email,
            customer_phone: parse_phone(&self.customer_phone)?,
            status: parse_column("order status", &self.status)?,
            payment_status: parse_column("payment status", &self.payment_status)?,
            payment_method: parse_column("payment method", &self.payment_method)?,
            items,
            subtotal: self.subtotal,
            shipping_fee: self.shipping_fee,
            tax: self.tax,
            tax_inclusive: self.tax_inclusive,
            total: self.total,
            shipping: ShippingInfo {
                recipient_name: self.recipient_name,
                phone: parse_phone(&self.shipping_phone)?,
                address_line: self.address_line,
                city: self.city,
                region: self.region,
                postal_code: self.postal_code,
                zone_id: self.zone_id.map(ShippingZoneId::new),
                instructions: self.instructions,
            },
            delivery,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const ORDER_SELECT: &str = r"
    SELECT o.id, o.order_number, o.customer_id, o.customer_name, o.customer_email,
           o.customer_phone, o.status, o.payment_status, o.payment_method,
           o.subtotal, o.shipping_fee, o.tax, o.tax_inclusive, o.total, o.notes,
           o.created_at, o.updated_at,
           s.recipient_name, s.phone AS shipping_phone, s.address_line, s.city, s.region,
           s.postal_code, s.zone_id, s.instructions,
           d.staff_id, d.staff_name, d.status AS delivery_status, d.assigned_at,
           d.started_at, d.completed_at, d.notes AS delivery_notes
    FROM orders o
    JOIN shipping_info s ON s.order_id = o.id
    LEFT JOIN delivery_info d ON d.order_id = o.id
";

impl PgStore {
    async fn hydrate_orders(&self, rows: Vec<OrderRow>) -> RepoResult<Vec<Order>> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, name, unit_price, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.order_id).or_default().push(OrderItem {
                product_id: ProductId::new(row.product_id),
                name: row.name,
                unit_price: row.unit_price,
                quantity: row.quantity,
            });
        }

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }

    async fn hydrate_one(&self, row: Option<OrderRow>) -> RepoResult<Option<Order>> {
        match row {
            Some(row) => Ok(self.hydrate_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn next_order_sequence(&self, day: NaiveDate) -> RepoResult<i32> {
        let value: i32 = sqlx::query_scalar(
            r"
            INSERT INTO order_number_counters (day, last_value)
            VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE SET last_value = order_number_counters.last_value + 1
            RETURNING last_value
            ",
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }

    async fn insert_order(&self, order: NewOrder) -> RepoResult<Order> {
        let product_ids: Vec<i32> = order.items.iter().map(|i| i.product_id.as_i32()).collect();
        let mut tx = self.pool.begin().await?;

        let reserved = sqlx::query(
            r"
            UPDATE products SET status = $2, updated_at = NOW()
            WHERE id = ANY($1) AND status = $3
            ",
        )
        .bind(&product_ids)
        .bind(ProductStatus::Reserved.as_str())
        .bind(ProductStatus::Active.as_str())
        .execute(&mut *tx)
        .await?;
        if reserved.rows_affected() != product_ids.len() as u64 {
            tx.rollback().await?;
            return Err(RepositoryError::Conflict(
                "one or more items are no longer available".to_owned(),
            ));
        }

        let order_id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO orders (order_number, customer_id, customer_name, customer_email,
                                customer_phone, payment_method, subtotal, shipping_fee, tax,
                                tax_inclusive, total, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            ",
        )
        .bind(&order.order_number)
        .bind(order.customer_id.map(UserId::as_i32))
        .bind(&order.customer_name)
        .bind(order.customer_email.as_str())
        .bind(order.customer_phone.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.subtotal)
        .bind(order.shipping_fee)
        .bind(order.tax)
        .bind(order.tax_inclusive)
        .bind(order.total)
        .bind(&order.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, "order number already exists"))?;

        let names: Vec<&str> = order.items.iter().map(|i| i.name.as_str()).collect();
        let prices: Vec<Decimal> = order.items.iter().map(|i| i.unit_price).collect();
        let quantities: Vec<i32> = order.items.iter().map(|i| i.quantity).collect();
        let positions: Vec<i32> = (0..).take(order.items.len()).collect();
        sqlx::query(
            r"
            INSERT INTO order_items (order_id, product_id, name, unit_price, quantity, position)
            SELECT $1, product_id, name, unit_price, quantity, position
            FROM UNNEST($2::INTEGER[], $3::TEXT[], $4::NUMERIC[], $5::INTEGER[], $6::INTEGER[])
                AS t(product_id, name, unit_price, quantity, position)
            ",
        )
        .bind(order_id)
        .bind(&product_ids)
        .bind(&names)
        .bind(&prices)
        .bind(&quantities)
        .bind(&positions)
        .execute(&mut *tx)
        .await?;

        let shipping = &order.shipping;
        sqlx::query(
            r"
            INSERT INTO shipping_info (order_id, recipient_name, phone, address_line, city,
                                       region, postal_code, zone_id, instructions)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(order_id)
        .bind(&shipping.recipient_name)
        .bind(shipping.phone.as_str())
        .bind(&shipping.address_line)
        .bind(&shipping.city)
        .bind(&shipping.region)
        .bind(&shipping.postal_code)
        .bind(shipping.zone_id.map(ShippingZoneId::as_i32))
        .bind(&shipping.instructions)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_order(OrderId::new(order_id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;
        self.hydrate_one(row).await
    }

    async fn find_order_by_number(&self, order_number: &str) -> RepoResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE UPPER(o.order_number) = UPPER($1)"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;
        self.hydrate_one(row).await
    }

    async fn list_orders(&self) -> RepoResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_orders(rows).await
    }

    async fn save_order_state(&self, order: &Order) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE orders SET status = $2, payment_status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(order.id.as_i32())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;
        require_affected(result.rows_affected())?;

        match &order.delivery {
            Some(delivery) => {
                sqlx::query(
                    r"
                    INSERT INTO delivery_info (order_id, staff_id, staff_name, status,
                                               assigned_at, started_at, completed_at, notes)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (order_id) DO UPDATE
                    SET staff_id = $2, staff_name = $3, status = $4, assigned_at = $5,
                        started_at = $6, completed_at = $7, notes = $8
                    ",
                )
                .bind(order.id.as_i32())
                .bind(delivery.staff_id.as_i32())
                .bind(&delivery.staff_name)
                .bind(delivery.status.as_str())
                .bind(delivery.assigned_at)
                .bind(delivery.started_at)
                .bind(delivery.completed_at)
                .bind(&delivery.notes)
                .execute(&mut *tx)
                .await
                .map_err(|e| conflict_or_database(e, "delivery staff member no longer exists"))?;
            }
            None => {
                sqlx::query("DELETE FROM delivery_info WHERE order_id = $1")
                    .bind(order.id.as_i32())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn product_on_open_order(&self, product: ProductId) -> RepoResult<bool> {
        let open: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM order_items i
                JOIN orders o ON o.id = i.order_id
                WHERE i.product_id = $1 AND o.status <> ALL($2)
            )
            ",
        )
        .bind(product.as_i32())
        .bind(vec![
            OrderStatus::Delivered.as_str(),
            OrderStatus::Cancelled.as_str(),
        ])
        .fetch_one(&self.pool)
        .await?;
        Ok(open)
    }
}
