//! Session cart service.
//!
//! The cart lives in the session as product ids and quantities. Every read
//! prices it against the current catalog; lines whose product disappeared or
//! was deactivated are dropped and reported in `CartView::removed`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;

use emporium_core::{CurrencyCode, ProductId};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::cart::CartLineError;
use crate::models::{Cart, CartView, CartViewLine, Product, session_keys};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product doesn't exist or isn't for sale.
    #[error("product not available")]
    ProductUnavailable,

    #[error("product is not in the cart")]
    NotInCart,

    #[error(transparent)]
    Line(#[from] CartLineError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart service bound to one session.
pub struct CartService<'a> {
    products: ProductRepository<'a>,
    session: &'a Session,
    currency: CurrencyCode,
}

impl<'a> CartService<'a> {
    /// Create a cart service for a session.
    #[must_use]
    pub const fn new(pool: &'a PgPool, session: &'a Session, currency: CurrencyCode) -> Self {
        Self {
            products: ProductRepository::new(pool),
            session,
            currency,
        }
    }

    /// The raw cart stored in the session.
    ///
    /// A missing or unreadable cart is treated as empty.
    pub async fn load(&self) -> Cart {
        self.session
            .get::<Cart>(session_keys::CART)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartError> {
        self.session.insert(session_keys::CART, cart).await?;
        Ok(())
    }

    /// Price the cart, pruning unavailable lines from the session.
    ///
    /// Returns the view together with the products it was priced against.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the product lookup fails.
    pub async fn priced(&self) -> Result<(CartView, Vec<Product>), CartError> {
        let mut cart = self.load().await;
        if cart.is_empty() {
            return Ok((price_cart(&cart, &[], self.currency), Vec::new()));
        }

        let ids: Vec<ProductId> = cart.lines().iter().map(|line| line.product_id).collect();
        let products = self.products.get_visible_by_ids(&ids).await?;
        let view = price_cart(&cart, &products, self.currency);

        if !view.removed.is_empty() {
            tracing::info!(removed = ?view.removed, "Dropping unavailable products from cart");
            cart.retain(|line| !view.removed.contains(&line.product_id));
            self.save(&cart).await?;
        }

        Ok((view, products))
    }

    /// The priced cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the product lookup fails.
    pub async fn view(&self) -> Result<CartView, CartError> {
        Ok(self.priced().await?.0)
    }

    /// Add units of a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductUnavailable` for missing or inactive products
    /// and `CartError::Line` when stock cannot cover the new quantity.
    pub async fn add(&self, product_id: ProductId, quantity: u32) -> Result<CartView, CartError> {
        let product = self.available_product(product_id).await?;
        let mut cart = self.load().await;
        cart.add(product_id, quantity, stock_of(&product))?;
        self.save(&cart).await?;
        self.view().await
    }

    /// Set the quantity of a line already in the cart. Zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product has no line.
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        let mut cart = self.load().await;
        if cart.quantity_of(product_id) == 0 {
            return Err(CartError::NotInCart);
        }

        if quantity == 0 {
            cart.remove(product_id);
        } else {
            let product = self.available_product(product_id).await?;
            cart.set_quantity(product_id, quantity, stock_of(&product))?;
        }

        self.save(&cart).await?;
        self.view().await
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product has no line.
    pub async fn remove(&self, product_id: ProductId) -> Result<CartView, CartError> {
        let mut cart = self.load().await;
        if !cart.remove(product_id) {
            return Err(CartError::NotInCart);
        }
        self.save(&cart).await?;
        self.view().await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session cannot be written.
    pub async fn clear(&self) -> Result<(), CartError> {
        self.session.remove::<Cart>(session_keys::CART).await?;
        Ok(())
    }

    async fn available_product(&self, product_id: ProductId) -> Result<Product, CartError> {
        self.products
            .get_visible_by_ids(&[product_id])
            .await?
            .into_iter()
            .next()
            .ok_or(CartError::ProductUnavailable)
    }
}

fn stock_of(product: &Product) -> u32 {
    u32::try_from(product.stock).unwrap_or(0)
}

/// Price cart lines against `products`.
///
/// Lines without a matching product are left out of the view and listed in
/// `removed`.
#[must_use]
pub fn price_cart(cart: &Cart, products: &[Product], currency: CurrencyCode) -> CartView {
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::with_capacity(cart.lines().len());
    let mut removed = Vec::new();
    let mut subtotal = Decimal::ZERO;
    let mut item_count = 0;

    for line in cart.lines() {
        let Some(product) = by_id.get(&line.product_id) else {
            removed.push(line.product_id);
            continue;
        };

        let line_total = product.price * Decimal::from(line.quantity);
        subtotal += line_total;
        item_count += line.quantity;

        lines.push(CartViewLine {
            product_id: product.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            image_url: product.image_url.clone(),
            unit_price: product.price,
            quantity: line.quantity,
            line_total,
            available: product.stock,
            in_stock: product.has_stock_for(line.quantity),
        });
    }

    CartView {
        lines,
        subtotal,
        item_count,
        currency: currency.code().to_string(),
        removed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use emporium_core::CategoryId;

    use super::*;

    fn product(id: i32, price: Decimal, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: CategoryId::new(1),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: None,
            price,
            stock,
            image_url: None,
            is_active: true,
            is_featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_cart_totals() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 2, 10).unwrap();
        cart.add(ProductId::new(2), 1, 10).unwrap();
        let products = vec![
            product(1, Decimal::new(1050, 2), 10),
            product(2, Decimal::new(399, 2), 10),
        ];

        let view = price_cart(&cart, &products, CurrencyCode::USD);

        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.subtotal, Decimal::new(2499, 2));
        assert_eq!(view.item_count, 3);
        assert_eq!(view.currency, "USD");
        assert!(view.removed.is_empty());
        assert_eq!(view.lines.first().map(|l| l.line_total), Some(Decimal::new(2100, 2)));
    }

    #[test]
    fn test_price_cart_drops_missing_products() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 1, 10).unwrap();
        cart.add(ProductId::new(2), 1, 10).unwrap();
        let products = vec![product(2, Decimal::new(500, 2), 10)];

        let view = price_cart(&cart, &products, CurrencyCode::USD);

        assert_eq!(view.removed, vec![ProductId::new(1)]);
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.subtotal, Decimal::new(500, 2));
    }

    #[test]
    fn test_price_cart_flags_short_stock() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 5, 10).unwrap();
        let products = vec![product(1, Decimal::ONE, 2)];

        let view = price_cart(&cart, &products, CurrencyCode::EUR);

        let line = view.lines.first().unwrap();
        assert!(!line.in_stock);
        assert_eq!(line.available, 2);
    }

    #[test]
    fn test_price_empty_cart() {
        let view = price_cart(&Cart::default(), &[], CurrencyCode::USD);
        assert!(view.lines.is_empty());
        assert_eq!(view.subtotal, Decimal::ZERO);
        assert_eq!(view.item_count, 0);
    }
}
