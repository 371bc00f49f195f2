//! Category repository.

use sqlx::PgPool;

use emporium_core::CategoryId;

use super::RepositoryError;
use crate::models::catalog::{Category, CategoryFields};

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            r"
            SELECT id, name, slug, description, image_url, is_active, created_at, updated_at
            FROM categories
            WHERE is_active
            ORDER BY name ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Every category, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            r"
            SELECT id, name, slug, description, image_url, is_active, created_at, updated_at
            FROM categories
            ORDER BY name ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            SELECT id, name, slug, description, image_url, is_active, created_at, updated_at
            FROM categories
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Get an active category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            SELECT id, name, slug, description, image_url, is_active, created_at, updated_at
            FROM categories
            WHERE slug = $1 AND is_active
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Insert a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, fields: &CategoryFields) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            INSERT INTO categories (name, slug, description, image_url, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, slug, description, image_url, is_active, created_at, updated_at
            ",
        )
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(fields.description.as_deref())
        .bind(fields.image_url.as_deref())
        .bind(fields.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_violation(e, "category slug already exists"))
    }

    /// Update a category's descriptive fields. Activation goes through
    /// [`CategoryRepository::set_active`] so products follow along.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        fields: &CategoryFields,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            UPDATE categories
            SET name = $2, slug = $3, description = $4, image_url = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, description, image_url, is_active, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(fields.description.as_deref())
        .bind(fields.image_url.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_violation(e, "category slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Activate or deactivate a category and all of its products atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn set_active(
        &self,
        id: CategoryId,
        is_active: bool,
    ) -> Result<(Category, u64), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let category = sqlx::query_as::<_, Category>(
            r"
            UPDATE categories
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, description, image_url, is_active, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let products = sqlx::query(
            r"
            UPDATE products
            SET is_active = $2, updated_at = NOW()
            WHERE category_id = $1 AND is_active <> $2
            ",
        )
        .bind(id)
        .bind(is_active)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((category, products.rows_affected()))
    }

    /// Number of products (active or not) in a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_count(&self, id: CategoryId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Delete a category.
    ///
    /// # Returns
    ///
    /// Returns `true` if the category was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if products still reference it.
    pub async fn delete(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::conflict_on_violation(e, "category still has products"))?;

        Ok(result.rows_affected() > 0)
    }
}
