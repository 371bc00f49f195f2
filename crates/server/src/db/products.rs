//! Product repository.

use sqlx::{PgPool, Postgres, QueryBuilder};

use emporium_core::{CategoryId, ProductId};

use super::{RepositoryError, like_pattern};
use crate::models::catalog::{Product, ProductFields, ProductFilter, checked_stock};
use crate::models::pagination::Pagination;

const PRODUCT_COLUMNS: &str = "p.id, p.category_id, p.name, p.slug, p.description, p.price, \
     p.stock, p.image_url, p.is_active, p.is_featured, p.created_at, p.updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active products in active categories, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_visible(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(PRODUCT_COLUMNS);
        query.push(" FROM products p JOIN categories c ON c.id = p.category_id");
        push_visible_filter(&mut query, filter);
        query.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        query.push_bind(pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(pagination.offset());

        let products = query
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;

        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p JOIN categories c ON c.id = p.category_id");
        push_visible_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((products, total))
    }

    /// Every product in the catalog, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        category_id: Option<CategoryId>,
        pagination: Pagination,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, category_id, name, slug, description, price, stock, image_url,
                   is_active, is_featured, created_at, updated_at
            FROM products
            WHERE $1::INTEGER IS NULL OR category_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(category_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE $1::INTEGER IS NULL OR category_id = $1",
        )
        .bind(category_id)
        .fetch_one(self.pool)
        .await?;

        Ok((products, total))
    }

    /// Active products of one category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active_in_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, category_id, name, slug, description, price, stock, image_url,
                   is_active, is_featured, created_at, updated_at
            FROM products
            WHERE category_id = $1 AND is_active
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by ID regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, category_id, name, slug, description, price, stock, image_url,
                   is_active, is_featured, created_at, updated_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get a product by slug if it and its category are active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_visible_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(PRODUCT_COLUMNS);
        query.push(
            " FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE p.is_active AND c.is_active AND p.slug = ",
        );
        query.push_bind(slug);

        let product = query
            .build_query_as::<Product>()
            .fetch_optional(self.pool)
            .await?;

        Ok(product)
    }

    /// Active products among `ids`, in any order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_visible_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(PRODUCT_COLUMNS);
        query.push(
            " FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE p.is_active AND c.is_active AND p.id = ANY(",
        );
        query.push_bind(raw);
        query.push(")");

        let products = query
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the
    /// category doesn't exist.
    pub async fn create(&self, fields: &ProductFields) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            INSERT INTO products (category_id, name, slug, description, price, stock,
                                  image_url, is_active, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, TRUE), COALESCE($9, FALSE))
            RETURNING id, category_id, name, slug, description, price, stock, image_url,
                      is_active, is_featured, created_at, updated_at
            ",
        )
        .bind(fields.category_id)
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(fields.description.as_deref())
        .bind(fields.price)
        .bind(fields.stock)
        .bind(fields.image_url.as_deref())
        .bind(fields.is_active)
        .bind(fields.is_featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_violation(e, "product slug already exists"))
    }

    /// Replace a product's fields. Flags left as `None` keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            UPDATE products
            SET category_id = $2, name = $3, slug = $4, description = $5, price = $6,
                stock = $7, image_url = $8, is_active = COALESCE($9, is_active),
                is_featured = COALESCE($10, is_featured),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, category_id, name, slug, description, price, stock, image_url,
                      is_active, is_featured, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(fields.category_id)
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(fields.description.as_deref())
        .bind(fields.price)
        .bind(fields.stock)
        .bind(fields.image_url.as_deref())
        .bind(fields.is_active)
        .bind(fields.is_featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_violation(e, "product slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Set a product's active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_active(&self, id: ProductId, is_active: bool) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            UPDATE products
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, category_id, name, slug, description, price, stock, image_url,
                      is_active, is_featured, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Add `delta` (possibly negative) to stock, keeping it within
    /// `0..=i32::MAX`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if stock would leave that range.
    pub async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<Product, RepositoryError> {
        // INTEGER addition raises on overflow, so the sum is taken as BIGINT.
        let updated = sqlx::query_as::<_, Product>(
            r"
            UPDATE products
            SET stock = (stock::BIGINT + $2)::INTEGER, updated_at = NOW()
            WHERE id = $1 AND stock::BIGINT + $2 BETWEEN 0 AND 2147483647
            RETURNING id, category_id, name, slug, description, price, stock, image_url,
                      is_active, is_featured, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(i64::from(delta))
        .fetch_optional(self.pool)
        .await?;

        if let Some(product) = updated {
            return Ok(product);
        }
        let product = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        let message = checked_stock(product.stock, delta)
            .err()
            .unwrap_or("stock changed during the adjustment");
        Err(RepositoryError::Conflict(message.to_owned()))
    }

    /// Whether any order line references the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_orders(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Delete a product.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if order lines reference it.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::conflict_on_violation(e, "product has orders"))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Append the storefront visibility and filter clauses.
fn push_visible_filter<'q>(query: &mut QueryBuilder<'q, Postgres>, filter: &'q ProductFilter) {
    query.push(" WHERE p.is_active AND c.is_active");
    if let Some(category) = filter.category.as_deref() {
        query.push(" AND c.slug = ");
        query.push_bind(category);
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = like_pattern(search);
        query.push(" AND (p.name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR p.description ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
    if let Some(featured) = filter.featured {
        query.push(" AND p.is_featured = ");
        query.push_bind(featured);
    }
}
