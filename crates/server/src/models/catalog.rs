//! Catalog types: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use emporium_core::{CategoryId, ProductId};

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sellable product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Unit price in the store currency.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Units on hand, never negative.
    pub stock: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can be sold right now.
    #[must_use]
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        i64::from(self.stock) >= i64::from(quantity)
    }
}

/// A category page: the category and its active products.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithProducts {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<Product>,
}

/// Validated category fields for create and update.
#[derive(Debug, Clone)]
pub struct CategoryFields {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
}

/// Validated product fields for create and update.
#[derive(Debug, Clone)]
pub struct ProductFields {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    /// `None` keeps the stored flag on update and means active on create.
    pub is_active: Option<bool>,
    /// `None` keeps the stored flag on update and means not featured on create.
    pub is_featured: Option<bool>,
}

impl ProductFields {
    /// Whether the product ends up active. `current` is the stored flag, or
    /// `None` when creating.
    #[must_use]
    pub fn resulting_active(&self, current: Option<bool>) -> bool {
        self.is_active.or(current).unwrap_or(true)
    }
}

/// Stock after adding `delta` to `current`, or why the adjustment is refused.
///
/// # Errors
///
/// Returns a message when the result would be negative or would not fit the
/// stock column.
pub fn checked_stock(current: i32, delta: i32) -> Result<i32, &'static str> {
    let next = i64::from(current) + i64::from(delta);
    if next < 0 {
        return Err("stock cannot go below zero");
    }
    i32::try_from(next).map_err(|_| "stock cannot exceed 2147483647 units")
}

/// Public product listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Category slug.
    pub category: Option<String>,
    /// Case-insensitive search over name and description.
    pub search: Option<String>,
    pub featured: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_stock() {
        assert_eq!(checked_stock(5, -5), Ok(0));
        assert_eq!(checked_stock(5, 10), Ok(15));
        assert_eq!(checked_stock(5, -6), Err("stock cannot go below zero"));
    }

    #[test]
    fn test_checked_stock_never_overflows() {
        assert_eq!(checked_stock(0, i32::MAX), Ok(i32::MAX));
        assert_eq!(
            checked_stock(1, i32::MAX),
            Err("stock cannot exceed 2147483647 units")
        );
        assert_eq!(
            checked_stock(i32::MAX, i32::MAX),
            Err("stock cannot exceed 2147483647 units")
        );
        assert_eq!(checked_stock(0, i32::MIN), Err("stock cannot go below zero"));
    }
}
