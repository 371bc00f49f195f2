//! Order repository.
//!
//! Order creation and cancellation run in a single transaction together with
//! the matching stock movements.

use rust_decimal::Decimal;
use sqlx::PgPool;

use emporium_core::{AddressId, OrderId, OrderStatus, PaymentInfoId, ProductId, UserId};

use super::RepositoryError;
use crate::models::order::{Order, OrderItem, OrderWithCustomer};
use crate::models::pagination::Pagination;

/// Order header to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub address_id: AddressId,
    pub payment_info_id: PaymentInfoId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub stripe_payment_intent_id: Option<String>,
    pub shipping_snapshot: String,
}

/// Order line to insert, with name and price snapshots.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Repository for orders and order items.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write an order, its items and the stock decrements atomically.
    ///
    /// Stock is decremented with a guarded update in product id order; if any
    /// product lacks stock the whole transaction is rolled back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a product has insufficient stock.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        order: &NewOrder,
        items: &[NewOrderItem],
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order_id: OrderId = sqlx::query_scalar(
            r"
            INSERT INTO orders (user_id, address_id, payment_info_id, status, subtotal, shipping,
                                tax, total, currency, stripe_payment_intent_id, shipping_snapshot)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            ",
        )
        .bind(order.user_id)
        .bind(order.address_id)
        .bind(order.payment_info_id)
        .bind(order.status)
        .bind(order.subtotal)
        .bind(order.shipping)
        .bind(order.tax)
        .bind(order.total)
        .bind(&order.currency)
        .bind(order.stripe_payment_intent_id.as_deref())
        .bind(&order.shipping_snapshot)
        .fetch_one(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, Order>(
            r"
            UPDATE orders
            SET order_number = 'ORD-' || to_char(created_at AT TIME ZONE 'UTC', 'YYYYMMDD') || '-' || id
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, OrderItem>(
                r"
                INSERT INTO order_items (order_id, product_id, product_name, unit_price,
                                         quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                ",
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.line_total)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        let mut by_product: Vec<&NewOrderItem> = items.iter().collect();
        by_product.sort_by_key(|item| item.product_id);
        for item in by_product {
            let result = sqlx::query(
                r"
                UPDATE products
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND stock >= $2
                ",
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(format!(
                    "insufficient stock for {}",
                    item.product_name
                )));
            }
        }

        tx.commit().await?;

        Ok((created, saved))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(order)
    }

    /// The order paid by `payment_intent_id`, if one was written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order =
            sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE stripe_payment_intent_id = $1")
                .bind(payment_intent_id)
                .fetch_optional(self.pool)
                .await?;

        Ok(order)
    }

    /// ID of the user's most recent order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_id_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<OrderId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, OrderId>(
            "SELECT id FROM orders WHERE user_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(id)
    }

    /// Lines of an order in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items =
            sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
                .bind(order_id)
                .fetch_all(self.pool)
                .await?;

        Ok(items)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT * FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok((orders, total))
    }

    /// All orders with their customer, newest first, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<(Vec<OrderWithCustomer>, i64), RepositoryError> {
        let orders = sqlx::query_as::<_, OrderWithCustomer>(
            r"
            SELECT o.*, u.email AS customer_email, u.name AS customer_name
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE $1::order_status IS NULL OR o.status = $1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE $1::order_status IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok((orders, total))
    }

    /// Move an order from `from` to `to`. The update only applies while the
    /// order is still in `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the status changed concurrently.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(
            r"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("order status changed".to_owned()))
    }

    /// Cancel an order and put its units back in stock atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order left `from` concurrently.
    pub async fn cancel_and_restock(
        &self,
        id: OrderId,
        from: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r"
            UPDATE orders
            SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("order status changed".to_owned()))?;

        sqlx::query(
            r"
            UPDATE products p
            SET stock = p.stock + oi.quantity, updated_at = NOW()
            FROM order_items oi
            WHERE oi.order_id = $1 AND p.id = oi.product_id
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(order)
    }
}
