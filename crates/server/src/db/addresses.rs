//! Address repository. Rows carry only the sealed address payload.

use sqlx::PgPool;

use emporium_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::account::AddressRecord;

/// Repository for saved addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AddressRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRecord>(
            r"
            SELECT id, user_id, label, sealed, is_default, created_at, updated_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at ASC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Get an address if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: AddressId,
        user_id: UserId,
    ) -> Result<Option<AddressRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRecord>(
            r"
            SELECT id, user_id, label, sealed, is_default, created_at, updated_at
            FROM addresses
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Save a sealed address. A user's first address becomes the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        label: &str,
        sealed: &str,
    ) -> Result<AddressRecord, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRecord>(
            r"
            INSERT INTO addresses (user_id, label, sealed, is_default)
            VALUES ($1, $2, $3, NOT EXISTS (SELECT 1 FROM addresses WHERE user_id = $1))
            RETURNING id, user_id, label, sealed, is_default, created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(label)
        .bind(sealed)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Replace the label and sealed payload of an owned address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn update(
        &self,
        id: AddressId,
        user_id: UserId,
        label: &str,
        sealed: &str,
    ) -> Result<AddressRecord, RepositoryError> {
        sqlx::query_as::<_, AddressRecord>(
            r"
            UPDATE addresses
            SET label = $3, sealed = $4, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, label, sealed, is_default, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(label)
        .bind(sealed)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Make an address the user's only default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such address.
    pub async fn set_default(
        &self,
        id: AddressId,
        user_id: UserId,
    ) -> Result<AddressRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default AND id <> $2",
        )
        .bind(user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, AddressRecord>(
            r"
            UPDATE addresses
            SET is_default = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, label, sealed, is_default, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;

        Ok(row)
    }

    /// Whether any order was shipped to this address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_referenced(&self, id: AddressId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE address_id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Delete an owned address. When the default is removed, the oldest
    /// remaining address takes its place.
    ///
    /// # Returns
    ///
    /// Returns `true` if the address was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if orders reference the address.
    pub async fn delete(&self, id: AddressId, user_id: UserId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let was_default: Option<bool> = sqlx::query_scalar(
            "DELETE FROM addresses WHERE id = $1 AND user_id = $2 RETURNING is_default",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::conflict_on_violation(e, "address is used by an order"))?;

        let Some(was_default) = was_default else {
            return Ok(false);
        };

        if was_default {
            sqlx::query(
                r"
                UPDATE addresses SET is_default = TRUE
                WHERE id = (
                    SELECT id FROM addresses WHERE user_id = $1 ORDER BY created_at ASC LIMIT 1
                )
                ",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(true)
    }
}
