//! Saved card repository.

use sqlx::PgPool;

use emporium_core::{PaymentInfoId, UserId};

use super::RepositoryError;
use crate::models::account::PaymentMethod;

/// Card display fields reported by the payment provider.
#[derive(Debug, Clone)]
pub struct NewPaymentMethod<'a> {
    pub stripe_payment_method_id: &'a str,
    pub brand: &'a str,
    pub last4: &'a str,
    pub exp_month: i32,
    pub exp_year: i32,
}

/// Repository for saved cards.
pub struct PaymentMethodRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentMethodRepository<'a> {
    /// Create a new payment method repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's cards, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<PaymentMethod>, RepositoryError> {
        let rows = sqlx::query_as::<_, PaymentMethod>(
            r"
            SELECT id, user_id, stripe_payment_method_id, brand, last4, exp_month, exp_year,
                   is_default, created_at
            FROM payment_methods
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at ASC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Get a card if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: PaymentInfoId,
        user_id: UserId,
    ) -> Result<Option<PaymentMethod>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentMethod>(
            r"
            SELECT id, user_id, stripe_payment_method_id, brand, last4, exp_month, exp_year,
                   is_default, created_at
            FROM payment_methods
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Record a card attached in Stripe. A user's first card becomes the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the card is already saved.
    pub async fn create(
        &self,
        user_id: UserId,
        card: &NewPaymentMethod<'_>,
    ) -> Result<PaymentMethod, RepositoryError> {
        sqlx::query_as::<_, PaymentMethod>(
            r"
            INSERT INTO payment_methods (user_id, stripe_payment_method_id, brand, last4,
                                         exp_month, exp_year, is_default)
            VALUES ($1, $2, $3, $4, $5, $6,
                    NOT EXISTS (SELECT 1 FROM payment_methods WHERE user_id = $1))
            RETURNING id, user_id, stripe_payment_method_id, brand, last4, exp_month, exp_year,
                      is_default, created_at
            ",
        )
        .bind(user_id)
        .bind(card.stripe_payment_method_id)
        .bind(card.brand)
        .bind(card.last4)
        .bind(card.exp_month)
        .bind(card.exp_year)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_violation(e, "payment method already saved"))
    }

    /// Make a card the user's only default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such card.
    pub async fn set_default(
        &self,
        id: PaymentInfoId,
        user_id: UserId,
    ) -> Result<PaymentMethod, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE payment_methods SET is_default = FALSE WHERE user_id = $1 AND is_default AND id <> $2",
        )
        .bind(user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, PaymentMethod>(
            r"
            UPDATE payment_methods
            SET is_default = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, stripe_payment_method_id, brand, last4, exp_month, exp_year,
                      is_default, created_at
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

    /// Delete an owned card. Orders keep their row with a null reference.
    ///
    /// # Returns
    ///
    /// Returns `true` if the card was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: PaymentInfoId, user_id: UserId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let was_default: Option<bool> = sqlx::query_scalar(
            "DELETE FROM payment_methods WHERE id = $1 AND user_id = $2 RETURNING is_default",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(was_default) = was_default else {
            return Ok(false);
        };

        if was_default {
            sqlx::query(
                r"
                UPDATE payment_methods SET is_default = TRUE
                WHERE id = (
                    SELECT id FROM payment_methods WHERE user_id = $1 ORDER BY created_at ASC LIMIT 1
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
