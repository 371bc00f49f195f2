//! Read-only aggregate queries for the back-office dashboard.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::dashboard::{CategorySales, DailySales, StatusCount, TopProduct};
use crate::models::order::OrderWithCustomer;

/// SQL list of the statuses that count as revenue.
const REVENUE_STATUSES: &str = "('paid', 'shipped', 'delivered')";

/// Products at or below this stock level are reported as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// Store-wide counters.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Counters {
    pub revenue: Decimal,
    pub orders: i64,
    pub customers: i64,
    pub products: i64,
    pub low_stock: i64,
    pub unread_messages: i64,
}

/// Repository for dashboard aggregates.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    /// Create a new dashboard repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Revenue, order, customer, product and inbox counters in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counters(&self) -> Result<Counters, RepositoryError> {
        let sql = format!(
            r"
            SELECT
                (SELECT COALESCE(SUM(total), 0) FROM orders WHERE status IN {REVENUE_STATUSES}) AS revenue,
                (SELECT COUNT(*) FROM orders WHERE status IN {REVENUE_STATUSES}) AS orders,
                (SELECT COUNT(*) FROM users WHERE role = 'customer') AS customers,
                (SELECT COUNT(*) FROM products WHERE is_active) AS products,
                (SELECT COUNT(*) FROM products WHERE is_active AND stock <= $1) AS low_stock,
                (SELECT COUNT(*) FROM contact_messages WHERE NOT is_read) AS unread_messages
            "
        );

        let counters = sqlx::query_as::<_, Counters>(&sql)
            .bind(LOW_STOCK_THRESHOLD)
            .fetch_one(self.pool)
            .await?;

        Ok(counters)
    }

    /// Revenue per UTC day since `since` (inclusive). Days without sales are absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_sales(&self, since: NaiveDate) -> Result<Vec<DailySales>, RepositoryError> {
        let sql = format!(
            r"
            SELECT (created_at AT TIME ZONE 'UTC')::DATE AS date,
                   SUM(total) AS revenue,
                   COUNT(*) AS orders
            FROM orders
            WHERE status IN {REVENUE_STATUSES}
              AND (created_at AT TIME ZONE 'UTC')::DATE >= $1
            GROUP BY 1
            ORDER BY 1
            "
        );

        let rows = sqlx::query_as::<_, DailySales>(&sql)
            .bind(since)
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }

    /// Best sellers by units sold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(&self, limit: i64) -> Result<Vec<TopProduct>, RepositoryError> {
        let sql = format!(
            r"
            SELECT oi.product_id,
                   p.name,
                   SUM(oi.quantity)::BIGINT AS units_sold,
                   SUM(oi.line_total) AS revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.status IN {REVENUE_STATUSES}
            GROUP BY oi.product_id, p.name
            ORDER BY units_sold DESC, revenue DESC, oi.product_id ASC
            LIMIT $1
            "
        );

        let rows = sqlx::query_as::<_, TopProduct>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }

    /// Order counts for the statuses that have at least one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_by_status(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Revenue per category, highest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_by_category(&self) -> Result<Vec<CategorySales>, RepositoryError> {
        let sql = format!(
            r"
            SELECT c.id AS category_id,
                   c.name,
                   SUM(oi.line_total) AS revenue,
                   SUM(oi.quantity)::BIGINT AS units_sold
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            JOIN categories c ON c.id = p.category_id
            WHERE o.status IN {REVENUE_STATUSES}
            GROUP BY c.id, c.name
            ORDER BY revenue DESC, c.id ASC
            "
        );

        let rows = sqlx::query_as::<_, CategorySales>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }

    /// Latest orders of any status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<OrderWithCustomer>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderWithCustomer>(
            r"
            SELECT o.*, u.email AS customer_email, u.name AS customer_name
            FROM orders o
            JOIN users u ON u.id = o.user_id
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use emporium_core::OrderStatus;

    use super::*;

    #[test]
    fn test_revenue_statuses_match_order_status() {
        let listed: Vec<String> = OrderStatus::ALL
            .into_iter()
            .filter(|status| status.is_revenue())
            .map(|status| format!("'{status}'"))
            .collect();
        assert_eq!(REVENUE_STATUSES, format!("({})", listed.join(", ")));
    }
}
