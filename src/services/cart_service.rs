//! Shopping cart state: line items, quantity rules, derived totals.
//!
//! The cart is pure in-memory state for the browsing session. No
//! operation performs I/O and no mutation has a suspension point, so two
//! UI-triggered edits can never observe a torn cart.

use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::error::{StoreError, StoreResult};
use crate::models::{CartLineItem, Product};

/// UI-imposed per-line quantity cap; the effective cap is the lower of
/// this and the product's stock count.
pub const MAX_QUANTITY_PER_LINE: u32 = 10;

fn quantity_cap(stock_count: Option<u32>) -> u32 {
    MAX_QUANTITY_PER_LINE.min(stock_count.unwrap_or(MAX_QUANTITY_PER_LINE))
}

/// Immutable view of the cart handed to the checkout orchestrator.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub items: Vec<CartLineItem>,
    pub subtotal: Decimal,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ordered cart contents. Insertion order is preserved for display and
/// at most one line item exists per product id.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` of `product`. An existing line for the same
    /// product id is incremented rather than duplicated. The resulting
    /// quantity silently saturates at `min(10, stock_count)`. Adding
    /// zero is a no-op whether or not the line exists.
    pub fn add_to_cart(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let cap = quantity_cap(product.stock_count);
        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity).min(cap);
            return;
        }
        if cap == 0 {
            // Out of stock: nothing to append.
            return;
        }
        self.items
            .push(CartLineItem::from_product(product, quantity.min(cap)));
    }

    /// Sets a line's quantity. Unknown product ids are a no-op; zero is
    /// rejected (removal is a separate operation); values above the cap
    /// saturate silently, same as `add_to_cart`.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> StoreResult<()> {
        if quantity == 0 {
            return Err(StoreError::Validation(
                "quantity must be a positive integer".into(),
            ));
        }
        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity.min(quantity_cap(line.stock_count));
        }
        Ok(())
    }

    /// Deletes the line if present; no-op otherwise.
    pub fn remove_from_cart(&mut self, product_id: &str) {
        self.items.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Recomputed from current line items on every read; never cached.
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            subtotal: self.subtotal(),
        }
    }
}

/// Clonable cart handle shared between the UI flow and the checkout
/// orchestrator. Each operation takes the lock for the duration of one
/// synchronous mutation; the lock is never held across an await.
#[derive(Clone, Default)]
pub struct SharedCart {
    inner: Arc<Mutex<Cart>>,
}

impl SharedCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_cart(&self, product: &Product, quantity: u32) {
        self.inner.lock().add_to_cart(product, quantity);
    }

    pub fn update_quantity(&self, product_id: &str, quantity: u32) -> StoreResult<()> {
        self.inner.lock().update_quantity(product_id, quantity)
    }

    pub fn remove_from_cart(&self, product_id: &str) {
        self.inner.lock().remove_from_cart(product_id);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn subtotal(&self) -> Decimal {
        self.inner.lock().subtotal()
    }

    pub fn item_count(&self) -> u32 {
        self.inner.lock().item_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn items(&self) -> Vec<CartLineItem> {
        self.inner.lock().items().to_vec()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: &str, price: &str, stock: Option<u32>) -> Product {
        let mut p = fixtures::sample_products()[0].clone();
        p.id = id.to_string();
        p.price = dec(price);
        p.stock_count = stock;
        p
    }

    #[test]
    fn adding_same_product_merges_lines() {
        let mut cart = Cart::new();
        let p = product("p1", "9.99", None);
        cart.add_to_cart(&p, 1);
        cart.add_to_cart(&p, 2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn add_saturates_at_cap_without_error() {
        let mut cart = Cart::new();
        let p = product("p1", "1.00", None);
        for _ in 0..15 {
            cart.add_to_cart(&p, 1);
        }
        assert_eq!(cart.items()[0].quantity, MAX_QUANTITY_PER_LINE);
    }

    #[test]
    fn stock_count_lowers_the_cap() {
        let mut cart = Cart::new();
        let p = product("p1", "1.00", Some(3));
        cart.add_to_cart(&p, 8);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn out_of_stock_product_is_not_added() {
        let mut cart = Cart::new();
        let p = product("p1", "1.00", Some(0));
        cart.add_to_cart(&p, 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn adding_zero_quantity_is_a_noop() {
        let mut cart = Cart::new();
        let p = product("p1", "1.00", None);
        cart.add_to_cart(&p, 0);
        assert!(cart.is_empty());

        cart.add_to_cart(&p, 2);
        cart.add_to_cart(&p, 0);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn subtotal_tracks_every_mutation() {
        let mut cart = Cart::new();
        let a = product("a", "19.99", None);
        let b = product("b", "5.00", None);
        cart.add_to_cart(&a, 2);
        cart.add_to_cart(&b, 1);
        assert_eq!(cart.subtotal(), dec("44.98"));

        cart.update_quantity("a", 1).unwrap();
        assert_eq!(cart.subtotal(), dec("24.99"));

        cart.remove_from_cart("b");
        assert_eq!(cart.subtotal(), dec("19.99"));

        cart.clear();
        assert_eq!(cart.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn update_quantity_on_unknown_id_is_a_noop() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("a", "1.00", None), 1);
        cart.update_quantity("missing", 5).unwrap();
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn update_quantity_rejects_zero() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("a", "1.00", None), 1);
        assert!(matches!(
            cart.update_quantity("a", 0),
            Err(StoreError::Validation(_))
        ));
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn update_quantity_clamps_above_cap() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("a", "1.00", Some(4)), 1);
        cart.update_quantity("a", 9).unwrap();
        assert_eq!(cart.items()[0].quantity, 4);
    }

    #[test]
    fn removing_unknown_id_is_a_noop() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("a", "1.00", None), 1);
        cart.remove_from_cart("missing");
        assert_eq!(cart.items().len(), 1);
    }
}
