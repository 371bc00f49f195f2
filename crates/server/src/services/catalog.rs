//! Catalog service: categories and products.
//!
//! Public reads of active categories are cached in memory for five minutes;
//! every catalog mutation clears the cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use emporium_core::{CategoryId, ProductId, slugify};

use super::{MAX_NAME_LENGTH, optional_text, required_text};
use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::models::{
    Category, CategoryFields, CategoryWithProducts, Page, Pagination, Product, ProductFields,
    ProductFilter,
};

const MAX_DESCRIPTION_LENGTH: usize = 5000;
const MAX_URL_LENGTH: usize = 2048;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    #[error("category not found")]
    CategoryNotFound,

    #[error("product not found")]
    ProductNotFound,

    /// A product cannot be active while its category is inactive.
    #[error("the product's category is inactive")]
    CategoryInactive,

    /// Categories with products cannot be deleted.
    #[error("category still has products")]
    CategoryNotEmpty,

    #[error("slug already in use: {0}")]
    SlugTaken(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<String> for CatalogError {
    fn from(message: String) -> Self {
        Self::Validation(message)
    }
}

// =============================================================================
// Cache
// =============================================================================

#[derive(Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    CategoryPage(Arc<CategoryWithProducts>),
}

/// In-memory cache for public category reads (5-minute TTL).
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<String, CacheValue>,
}

impl CatalogCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self { cache }
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Input
// =============================================================================

/// Category fields as submitted by the back office.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    /// Derived from the name when omitted.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl CategoryInput {
    /// Validate and normalize.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` describing the first invalid field.
    pub fn validate(&self) -> Result<CategoryFields, CatalogError> {
        let name = required_text("name", &self.name, MAX_NAME_LENGTH)?;
        Ok(CategoryFields {
            slug: resolve_slug(self.slug.as_deref(), &name)?,
            name,
            description: optional_text(
                "description",
                self.description.as_deref(),
                MAX_DESCRIPTION_LENGTH,
            )?,
            image_url: optional_text("image_url", self.image_url.as_deref(), MAX_URL_LENGTH)?,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

/// Product fields as submitted by the back office.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl ProductInput {
    /// Validate and normalize.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` describing the first invalid field.
    pub fn validate(&self) -> Result<ProductFields, CatalogError> {
        let name = required_text("name", &self.name, MAX_NAME_LENGTH)?;

        if self.price <= Decimal::ZERO {
            return Err(CatalogError::Validation(
                "price must be greater than zero".to_string(),
            ));
        }
        if self.price.normalize().scale() > 2 {
            return Err(CatalogError::Validation(
                "price must have at most two decimal places".to_string(),
            ));
        }
        if self.price >= Decimal::new(10_000_000_000, 0) {
            return Err(CatalogError::Validation("price is too large".to_string()));
        }
        if self.stock < 0 {
            return Err(CatalogError::Validation(
                "stock cannot be negative".to_string(),
            ));
        }

        Ok(ProductFields {
            category_id: self.category_id,
            slug: resolve_slug(self.slug.as_deref(), &name)?,
            name,
            description: optional_text(
                "description",
                self.description.as_deref(),
                MAX_DESCRIPTION_LENGTH,
            )?,
            price: self.price,
            stock: self.stock,
            image_url: optional_text("image_url", self.image_url.as_deref(), MAX_URL_LENGTH)?,
            is_active: self.is_active,
            is_featured: self.is_featured,
        })
    }
}

fn resolve_slug(slug: Option<&str>, name: &str) -> Result<String, CatalogError> {
    let slug = match slug.map(str::trim) {
        Some(given) if !given.is_empty() => slugify(given),
        _ => slugify(name),
    };
    if slug.is_empty() {
        return Err(CatalogError::Validation(
            "slug must contain at least one letter or digit".to_string(),
        ));
    }
    if slug.len() > MAX_NAME_LENGTH {
        return Err(CatalogError::Validation(format!(
            "slug must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(slug)
}

// =============================================================================
// Service
// =============================================================================

/// Result of changing a category's status.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStatusChange {
    pub category: Category,
    /// Products whose status changed along with the category.
    pub products_affected: u64,
}

/// What happened to a product removed from the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductRemoval {
    Deleted,
    /// The product appears on orders, so it was deactivated instead.
    Deactivated,
}

/// Catalog service.
pub struct CatalogService<'a> {
    categories: CategoryRepository<'a>,
    products: ProductRepository<'a>,
    cache: &'a CatalogCache,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            categories: CategoryRepository::new(pool),
            products: ProductRepository::new(pool),
            cache,
        }
    }

    // =========================================================================
    // Storefront
    // =========================================================================

    /// Active categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn active_categories(&self) -> Result<Arc<Vec<Category>>, CatalogError> {
        let cache_key = "categories".to_string();

        if let Some(CacheValue::Categories(categories)) = self.cache.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(self.categories.list_active().await?);
        self.cache
            .cache
            .insert(cache_key, CacheValue::Categories(Arc::clone(&categories)))
            .await;

        Ok(categories)
    }

    /// An active category and its active products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` if no active category has this slug.
    pub async fn category_page(&self, slug: &str) -> Result<Arc<CategoryWithProducts>, CatalogError> {
        let cache_key = format!("category:{slug}");

        if let Some(CacheValue::CategoryPage(page)) = self.cache.cache.get(&cache_key).await {
            debug!(slug, "Cache hit for category page");
            return Ok(page);
        }

        let category = self
            .categories
            .get_active_by_slug(slug)
            .await?
            .ok_or(CatalogError::CategoryNotFound)?;
        let products = self.products.list_active_in_category(category.id).await?;

        let page = Arc::new(CategoryWithProducts { category, products });
        self.cache
            .cache
            .insert(cache_key, CacheValue::CategoryPage(Arc::clone(&page)))
            .await;

        Ok(page)
    }

    /// Visible products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn visible_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<Page<Product>, CatalogError> {
        let (products, total) = self.products.list_visible(filter, pagination).await?;
        Ok(Page::new(products, pagination, total))
    }

    /// A visible product by slug.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if it is missing or hidden.
    pub async fn visible_product(&self, slug: &str) -> Result<Product, CatalogError> {
        self.products
            .get_visible_by_slug(slug)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    // =========================================================================
    // Back office: categories
    // =========================================================================

    /// Every category, active or not.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn all_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories.list_all().await?)
    }

    /// A category by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` if it doesn't exist.
    pub async fn category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        self.categories
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for invalid input and
    /// `CatalogError::SlugTaken` if the slug is in use.
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, CatalogError> {
        let fields = input.validate()?;
        let category = self
            .categories
            .create(&fields)
            .await
            .map_err(|e| slug_conflict(e, &fields.slug))?;

        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        self.cache.invalidate_all().await;

        Ok(category)
    }

    /// Replace a category's fields. A changed `is_active` cascades to its products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` if it doesn't exist.
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, CatalogError> {
        let fields = input.validate()?;
        let mut category = self
            .categories
            .update(id, &fields)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::CategoryNotFound,
                other => slug_conflict(other, &fields.slug),
            })?;

        if input.is_active.is_some_and(|active| active != category.is_active) {
            category = self.set_category_status(id, fields.is_active).await?.category;
        }

        self.cache.invalidate_all().await;

        Ok(category)
    }

    /// Activate or deactivate a category together with its products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` if it doesn't exist.
    pub async fn set_category_status(
        &self,
        id: CategoryId,
        is_active: bool,
    ) -> Result<CategoryStatusChange, CatalogError> {
        let (category, products_affected) = self
            .categories
            .set_active(id, is_active)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::CategoryNotFound,
                other => CatalogError::Repository(other),
            })?;

        tracing::info!(
            category_id = %id,
            is_active,
            products_affected,
            "Category status changed"
        );
        self.cache.invalidate_all().await;

        Ok(CategoryStatusChange {
            category,
            products_affected,
        })
    }

    /// Delete an empty category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotEmpty` if it still has products.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        if self.categories.product_count(id).await? > 0 {
            return Err(CatalogError::CategoryNotEmpty);
        }

        let deleted = self.categories.delete(id).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => CatalogError::CategoryNotEmpty,
            other => CatalogError::Repository(other),
        })?;
        if !deleted {
            return Err(CatalogError::CategoryNotFound);
        }

        tracing::info!(category_id = %id, "Category deleted");
        self.cache.invalidate_all().await;

        Ok(())
    }

    // =========================================================================
    // Back office: products
    // =========================================================================

    /// Every product, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn all_products(
        &self,
        category_id: Option<CategoryId>,
        pagination: Pagination,
    ) -> Result<Page<Product>, CatalogError> {
        let (products, total) = self.products.list_all(category_id, pagination).await?;
        Ok(Page::new(products, pagination, total))
    }

    /// A product by ID regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if it doesn't exist.
    pub async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the category doesn't exist and
    /// `CatalogError::CategoryInactive` for an active product in an inactive category.
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, CatalogError> {
        let fields = input.validate()?;
        self.check_category(&fields, None).await?;

        let product = self
            .products
            .create(&fields)
            .await
            .map_err(|e| slug_conflict(e, &fields.slug))?;

        tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
        self.cache.invalidate_all().await;

        Ok(product)
    }

    /// Replace a product's fields. Omitted `is_active` and `is_featured` keep
    /// their current values.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if it doesn't exist and
    /// `CatalogError::CategoryInactive` if the product would be active in an
    /// inactive category.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, CatalogError> {
        let fields = input.validate()?;
        let current = self.product(id).await?;
        self.check_category(&fields, Some(current.is_active)).await?;

        let product = self
            .products
            .update(id, &fields)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::ProductNotFound,
                other => slug_conflict(other, &fields.slug),
            })?;

        self.cache.invalidate_all().await;

        Ok(product)
    }

    /// Activate or deactivate a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryInactive` when activating a product whose
    /// category is inactive.
    pub async fn set_product_status(
        &self,
        id: ProductId,
        is_active: bool,
    ) -> Result<Product, CatalogError> {
        if is_active {
            let product = self.product(id).await?;
            let category = self.category(product.category_id).await?;
            if !category.is_active {
                return Err(CatalogError::CategoryInactive);
            }
        }

        let product = self
            .products
            .set_active(id, is_active)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::ProductNotFound,
                other => CatalogError::Repository(other),
            })?;

        tracing::info!(product_id = %id, is_active, "Product status changed");
        self.cache.invalidate_all().await;

        Ok(product)
    }

    /// Add `delta` units to stock.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if stock would go below zero or past
    /// `i32::MAX`.
    pub async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<Product, CatalogError> {
        let product = self
            .products
            .adjust_stock(id, delta)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::ProductNotFound,
                RepositoryError::Conflict(message) => CatalogError::Validation(message),
                other => CatalogError::Repository(other),
            })?;

        tracing::info!(product_id = %id, delta, stock = product.stock, "Stock adjusted");
        self.cache.invalidate_all().await;

        Ok(product)
    }

    /// Delete a product, or deactivate it when orders reference it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if it doesn't exist.
    pub async fn remove_product(&self, id: ProductId) -> Result<ProductRemoval, CatalogError> {
        let removal = if self.products.has_orders(id).await? {
            self.products.set_active(id, false).await.map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::ProductNotFound,
                other => CatalogError::Repository(other),
            })?;
            ProductRemoval::Deactivated
        } else {
            if !self.products.delete(id).await? {
                return Err(CatalogError::ProductNotFound);
            }
            ProductRemoval::Deleted
        };

        tracing::info!(product_id = %id, ?removal, "Product removed");
        self.cache.invalidate_all().await;

        Ok(removal)
    }

    async fn check_category(
        &self,
        fields: &ProductFields,
        current_active: Option<bool>,
    ) -> Result<(), CatalogError> {
        let category = self
            .categories
            .get_by_id(fields.category_id)
            .await?
            .ok_or_else(|| CatalogError::Validation("category does not exist".to_string()))?;

        if fields.resulting_active(current_active) && !category.is_active {
            return Err(CatalogError::CategoryInactive);
        }
        Ok(())
    }
}

fn slug_conflict(err: RepositoryError, slug: &str) -> CatalogError {
    match err {
        RepositoryError::Conflict(_) => CatalogError::SlugTaken(slug.to_string()),
        other => CatalogError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product_input() -> ProductInput {
        ProductInput {
            category_id: CategoryId::new(1),
            name: "Blue Mug".to_string(),
            slug: None,
            description: Some("  ".to_string()),
            price: Decimal::new(1250, 2),
            stock: 3,
            image_url: None,
            is_active: None,
            is_featured: None,
        }
    }

    #[test]
    fn test_category_slug_from_name() {
        let input = CategoryInput {
            name: "  Kitchen & Dining ".to_string(),
            slug: None,
            description: None,
            image_url: None,
            is_active: None,
        };
        let fields = input.validate().unwrap();
        assert_eq!(fields.name, "Kitchen & Dining");
        assert_eq!(fields.slug, "kitchen-dining");
        assert!(fields.is_active);
    }

    #[test]
    fn test_explicit_slug_is_normalized() {
        let input = CategoryInput {
            name: "Mugs".to_string(),
            slug: Some("Coffee MUGS!".to_string()),
            description: None,
            image_url: None,
            is_active: Some(false),
        };
        let fields = input.validate().unwrap();
        assert_eq!(fields.slug, "coffee-mugs");
        assert!(!fields.is_active);
    }

    #[test]
    fn test_unsluggable_name_rejected() {
        let input = CategoryInput {
            name: "!!!".to_string(),
            slug: None,
            description: None,
            image_url: None,
            is_active: None,
        };
        assert!(matches!(input.validate(), Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_product_defaults() {
        let fields = product_input().validate().unwrap();
        assert_eq!(fields.slug, "blue-mug");
        assert_eq!(fields.description, None);
        assert_eq!(fields.is_active, None);
        assert_eq!(fields.is_featured, None);
        assert!(fields.resulting_active(None));
    }

    #[test]
    fn test_product_edit_without_flag_keeps_status() {
        let fields = product_input().validate().unwrap();
        assert!(!fields.resulting_active(Some(false)));
        assert!(fields.resulting_active(Some(true)));

        let mut input = product_input();
        input.is_active = Some(true);
        assert!(input.validate().unwrap().resulting_active(Some(false)));

        input.is_active = Some(false);
        let fields = input.validate().unwrap();
        assert!(!fields.resulting_active(None));
        assert!(!fields.resulting_active(Some(true)));
    }

    #[test]
    fn test_product_price_rules() {
        let mut input = product_input();
        input.price = Decimal::ZERO;
        assert!(input.validate().is_err());

        input.price = Decimal::new(-100, 2);
        assert!(input.validate().is_err());

        input.price = Decimal::new(12_345, 3);
        assert!(input.validate().is_err());

        input.price = Decimal::new(12_500, 3);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_product_negative_stock_rejected() {
        let mut input = product_input();
        input.stock = -1;
        assert!(matches!(input.validate(), Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_product_name_required() {
        let mut input = product_input();
        input.name = " ".to_string();
        assert!(matches!(input.validate(), Err(CatalogError::Validation(_))));
    }
}
