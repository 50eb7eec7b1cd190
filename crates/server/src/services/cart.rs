//! Storefront cart backed by the session.

use rust_decimal::Decimal;

use thriftstore_core::{Price, ProductId, UserId};

use super::orders::OrderService;
use super::settings::SettingsService;
use crate::db::{CatalogStore, SettingsStore};
use crate::error::AppError;
use crate::models::{Cart, CartLineView, CartView, CheckoutRequest, Order};

pub struct CartService<'a> {
    catalog: &'a dyn CatalogStore,
    settings: &'a dyn SettingsStore,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogStore, settings: &'a dyn SettingsStore) -> Self {
        Self { catalog, settings }
    }

    /// Price the cart, dropping items that are no longer for sale.
    pub async fn view(&self, cart: &mut Cart) -> Result<CartView, AppError> {
        let currency = SettingsService::new(self.settings)
            .store_settings()
            .await?
            .currency;

        let mut items = Vec::with_capacity(cart.product_ids.len());
        let mut unavailable = Vec::new();
        for id in &cart.product_ids {
            match self.catalog.get_product(*id).await? {
                Some(product) if product.is_available() => items.push(CartLineView {
                    product_id: product.id,
                    price_display: Price::new(product.price, currency).display(),
                    price: product.price,
                    image: product.images.into_iter().next(),
                    name: product.name,
                }),
                _ => unavailable.push(*id),
            }
        }
        for id in &unavailable {
            cart.remove(*id);
        }

        let subtotal: Decimal = items.iter().map(|line| line.price).sum();
        Ok(CartView {
            item_count: items.len(),
            items,
            subtotal,
            subtotal_display: Price::new(subtotal, currency).display(),
            unavailable,
        })
    }

    /// Add a product that is currently for sale. Adding twice is a no-op.
    pub async fn add_item(&self, cart: &mut Cart, id: ProductId) -> Result<CartView, AppError> {
        let product = self
            .catalog
            .get_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        if !product.is_available() {
            return Err(AppError::Conflict(format!(
                "'{}' is no longer available",
                product.name
            )));
        }
        cart.add(id);
        self.view(cart).await
    }

    pub async fn remove_item(&self, cart: &mut Cart, id: ProductId) -> Result<CartView, AppError> {
        cart.remove(id);
        self.view(cart).await
    }

    pub async fn clear(&self, cart: &mut Cart) -> Result<CartView, AppError> {
        *cart = Cart::default();
        self.view(cart).await
    }

    /// Place an order for everything in the cart and empty it.
    ///
    /// Items listed in the request are ignored; the cart is the source.
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        mut details: CheckoutRequest,
        customer_id: Option<UserId>,
        orders: &OrderService<'_>,
    ) -> Result<Order, AppError> {
        if cart.is_empty() {
            return Err(AppError::BadRequest("your cart is empty".to_string()));
        }
        details.items.clone_from(&cart.product_ids);
        let order = orders.place_order(details, customer_id).await?;
        *cart = Cart::default();
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use thriftstore_core::ProductStatus;

    use super::*;
    use crate::db::Stores;
    use crate::services::testing::{checkout_for, seed_product};

    #[tokio::test]
    async fn test_add_is_idempotent_and_view_drops_sold_items() {
        let stores = Stores::memory();
        let coat = seed_product(&stores, "Wool Coat", 2200).await;
        let hat = seed_product(&stores, "Bucket Hat", 300).await;
        let service = CartService::new(stores.catalog.as_ref(), stores.settings.as_ref());
        let mut cart = Cart::default();

        service.add_item(&mut cart, coat.id).await.unwrap();
        let view = service.add_item(&mut cart, coat.id).await.unwrap();
        assert_eq!(view.item_count, 1);
        service.add_item(&mut cart, hat.id).await.unwrap();

        stores
            .catalog
            .set_product_status(&[hat.id], ProductStatus::Sold)
            .await
            .unwrap();
        let view = service.view(&mut cart).await.unwrap();
        assert_eq!(view.item_count, 1);
        assert_eq!(view.unavailable, vec![hat.id]);
        assert_eq!(view.subtotal_display, "KSh 2,200.00");
        assert_eq!(cart.product_ids, vec![coat.id]);

        assert!(matches!(
            service.add_item(&mut cart, hat.id).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_checkout_places_order_and_clears_cart() {
        let stores = Stores::memory();
        let coat = seed_product(&stores, "Wool Coat", 2200).await;
        let service = CartService::new(stores.catalog.as_ref(), stores.settings.as_ref());
        let orders = OrderService::new(&stores);
        let mut cart = Cart::default();

        assert!(matches!(
            service
                .checkout(&mut cart, checkout_for(&[]), None, &orders)
                .await,
            Err(AppError::BadRequest(_))
        ));

        service.add_item(&mut cart, coat.id).await.unwrap();
        let order = service
            .checkout(&mut cart, checkout_for(&[]), None, &orders)
            .await
            .unwrap();
        assert_eq!(order.items.len(), 1);
        assert!(cart.is_empty());
    }
}
