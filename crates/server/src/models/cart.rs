//! Session-backed shopping cart.
//!
//! The cart stores only product ids and quantities. Names, prices and
//! availability are looked up again every time the cart is viewed, so a price
//! change in the back office is reflected immediately.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use emporium_core::ProductId;

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// One product in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Rejected cart change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CartLineError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("only {available} left in stock")]
    InsufficientStock { available: u32 },
}

/// Cart lines in insertion order, one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Quantity currently held for a product.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Add units of a product, merging with an existing line.
    ///
    /// The merged quantity is capped at [`MAX_LINE_QUANTITY`] and must not
    /// exceed `stock`. Returns the new line quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartLineError::ZeroQuantity` when adding nothing and
    /// `CartLineError::InsufficientStock` when stock cannot cover the line.
    pub fn add(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        stock: u32,
    ) -> Result<u32, CartLineError> {
        if quantity == 0 {
            return Err(CartLineError::ZeroQuantity);
        }
        let wanted = self
            .quantity_of(product_id)
            .saturating_add(quantity)
            .min(MAX_LINE_QUANTITY);
        self.put(product_id, wanted, stock)
    }

    /// Replace the quantity of a line. Zero removes the line.
    ///
    /// Returns the new quantity, or `None` when the line was removed.
    ///
    /// # Errors
    ///
    /// Returns `CartLineError::InsufficientStock` when stock cannot cover the line.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        stock: u32,
    ) -> Result<Option<u32>, CartLineError> {
        if quantity == 0 {
            self.remove(product_id);
            return Ok(None);
        }
        self.put(product_id, quantity.min(MAX_LINE_QUANTITY), stock)
            .map(Some)
    }

    /// Remove a product. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    /// Keep only the lines matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&CartLine) -> bool) {
        self.lines.retain(keep);
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    fn put(&mut self, product_id: ProductId, quantity: u32, stock: u32) -> Result<u32, CartLineError> {
        if quantity > stock {
            return Err(CartLineError::InsufficientStock { available: stock });
        }
        match self.lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
        Ok(quantity)
    }
}

/// A priced cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartViewLine {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    /// Units currently in stock.
    pub available: i32,
    /// Whether stock still covers the line quantity.
    pub in_stock: bool,
}

/// The cart as shown to the shopper.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartViewLine>,
    pub subtotal: Decimal,
    pub item_count: u32,
    pub currency: String,
    /// Products dropped because they were deleted or deactivated.
    pub removed: Vec<ProductId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const A: ProductId = ProductId::new(1);
    const B: ProductId = ProductId::new(2);

    #[test]
    fn test_add_merges_lines() {
        let mut cart = Cart::default();
        cart.add(A, 2, 10).unwrap();
        cart.add(B, 1, 10).unwrap();
        assert_eq!(cart.add(A, 3, 10), Ok(5));
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_add_caps_at_line_maximum() {
        let mut cart = Cart::default();
        cart.add(A, 60, 1000).unwrap();
        assert_eq!(cart.add(A, 60, 1000), Ok(MAX_LINE_QUANTITY));
    }

    #[test]
    fn test_add_rejects_over_stock() {
        let mut cart = Cart::default();
        cart.add(A, 3, 4).unwrap();
        assert_eq!(
            cart.add(A, 2, 4),
            Err(CartLineError::InsufficientStock { available: 4 })
        );
        assert_eq!(cart.quantity_of(A), 3);
    }

    #[test]
    fn test_add_zero_is_rejected() {
        let mut cart = Cart::default();
        assert_eq!(cart.add(A, 0, 4), Err(CartLineError::ZeroQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::default();
        cart.add(A, 3, 4).unwrap();
        assert_eq!(cart.set_quantity(A, 0, 4), Ok(None));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_replaces() {
        let mut cart = Cart::default();
        cart.add(A, 3, 10).unwrap();
        assert_eq!(cart.set_quantity(A, 1, 10), Ok(Some(1)));
        assert_eq!(cart.quantity_of(A), 1);
    }

    #[test]
    fn test_remove_reports_missing_line() {
        let mut cart = Cart::default();
        cart.add(A, 1, 1).unwrap();
        assert!(cart.remove(A));
        assert!(!cart.remove(A));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut cart = Cart::default();
        cart.add(A, 2, 5).unwrap();
        let json = serde_json::to_string(&cart).unwrap();
        assert_eq!(json, r#"[{"product_id":1,"quantity":2}]"#);
    }
}
