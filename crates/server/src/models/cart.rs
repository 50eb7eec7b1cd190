//! Storefront cart.
//!
//! The cart lives in the shopper's session and holds product IDs only;
//! prices and availability are read from the catalog whenever it is shown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use thriftstore_core::ProductId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub product_ids: Vec<ProductId>,
}

impl Cart {
    /// Add an item. Items are one-of-a-kind so adding twice is a no-op.
    /// Returns whether the cart changed.
    pub fn add(&mut self, product_id: ProductId) -> bool {
        if self.product_ids.contains(&product_id) {
            return false;
        }
        self.product_ids.push(product_id);
        true
    }

    /// Returns whether the item was in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.product_ids.len();
        self.product_ids.retain(|id| *id != product_id);
        before != self.product_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.product_ids.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub price_display: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: usize,
    pub subtotal: Decimal,
    pub subtotal_display: String,
    /// Items dropped because they were sold or unlisted since being added.
    pub unavailable: Vec<ProductId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adding_same_item_twice_is_idempotent() {
        let mut cart = Cart::default();
        assert!(cart.add(ProductId::new(3)));
        assert!(!cart.add(ProductId::new(3)));
        assert_eq!(cart.product_ids, vec![ProductId::new(3)]);
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1));
        assert!(cart.remove(ProductId::new(1)));
        assert!(!cart.remove(ProductId::new(1)));
        assert!(cart.is_empty());
    }
}
