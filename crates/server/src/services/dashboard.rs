//! Back-office analytics.
//!
//! Only paid, shipped and delivered orders count as revenue. The repository
//! returns sparse rows; this module fills the gaps.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use emporium_core::{OrderStatus, round_money};

use crate::db::{DashboardRepository, RepositoryError};
use crate::models::OrderWithCustomer;
use crate::models::dashboard::{
    CategorySales, DailySales, DashboardSummary, StatusCount, TopProduct,
};

/// Accepted length of the sales series, in days.
pub const SALES_DAYS: RangeInclusive<u32> = 1..=365;

/// Accepted size of the top-products and recent-orders lists.
pub const LIST_LIMIT: RangeInclusive<u32> = 1..=50;

/// Errors from dashboard queries.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Dashboard service.
pub struct DashboardService<'a> {
    dashboard: DashboardRepository<'a>,
}

impl<'a> DashboardService<'a> {
    /// Create a new dashboard service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            dashboard: DashboardRepository::new(pool),
        }
    }

    /// Headline counters.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Repository` if the query fails.
    pub async fn summary(&self) -> Result<DashboardSummary, DashboardError> {
        let counters = self.dashboard.counters().await?;

        Ok(DashboardSummary {
            average_order_value: average_order_value(counters.revenue, counters.orders),
            revenue: counters.revenue,
            orders: counters.orders,
            customers: counters.customers,
            products: counters.products,
            low_stock: counters.low_stock,
            unread_messages: counters.unread_messages,
        })
    }

    /// Daily revenue for the last `days` days, oldest first, today included.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Validation` if `days` is outside 1..=365.
    pub async fn sales(&self, days: u32) -> Result<Vec<DailySales>, DashboardError> {
        check_range("days", days, &SALES_DAYS)?;

        let today = Utc::now().date_naive();
        let since = series_start(today, days);
        let rows = self.dashboard.daily_sales(since).await?;

        Ok(zero_fill(&rows, today, days))
    }

    /// Best sellers by units sold.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Validation` if `limit` is outside 1..=50.
    pub async fn top_products(&self, limit: u32) -> Result<Vec<TopProduct>, DashboardError> {
        check_range("limit", limit, &LIST_LIMIT)?;
        Ok(self.dashboard.top_products(i64::from(limit)).await?)
    }

    /// Order count for every status, zeros included.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Repository` if the query fails.
    pub async fn orders_by_status(&self) -> Result<Vec<StatusCount>, DashboardError> {
        let rows = self.dashboard.orders_by_status().await?;
        Ok(status_counts(&rows))
    }

    /// Revenue per category, highest first.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Repository` if the query fails.
    pub async fn sales_by_category(&self) -> Result<Vec<CategorySales>, DashboardError> {
        Ok(self.dashboard.sales_by_category().await?)
    }

    /// Latest orders of any status.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Validation` if `limit` is outside 1..=50.
    pub async fn recent_orders(&self, limit: u32) -> Result<Vec<OrderWithCustomer>, DashboardError> {
        check_range("limit", limit, &LIST_LIMIT)?;
        Ok(self.dashboard.recent_orders(i64::from(limit)).await?)
    }
}

fn check_range(field: &str, value: u32, range: &RangeInclusive<u32>) -> Result<(), DashboardError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(DashboardError::Validation(format!(
            "{field} must be between {} and {}",
            range.start(),
            range.end()
        )))
    }
}

fn series_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

// =============================================================================
// Pure shaping
// =============================================================================

/// Revenue divided by order count, rounded to cents. Zero when there are no orders.
#[must_use]
pub fn average_order_value(revenue: Decimal, orders: i64) -> Decimal {
    if orders <= 0 {
        return Decimal::ZERO;
    }
    round_money(revenue / Decimal::from(orders))
}

/// One entry per day from `days - 1` days before `today` up to `today`.
///
/// Days missing from `rows` get zero revenue and zero orders.
#[must_use]
pub fn zero_fill(rows: &[DailySales], today: NaiveDate, days: u32) -> Vec<DailySales> {
    let by_date: HashMap<NaiveDate, &DailySales> = rows.iter().map(|r| (r.date, r)).collect();

    series_start(today, days)
        .iter_days()
        .take_while(|date| *date <= today)
        .map(|date| {
            by_date.get(&date).map_or_else(
                || DailySales {
                    date,
                    revenue: Decimal::ZERO,
                    orders: 0,
                },
                |row| (*row).clone(),
            )
        })
        .collect()
}

/// Counts for every status in lifecycle order, zero where absent.
#[must_use]
pub fn status_counts(rows: &[StatusCount]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: rows
                .iter()
                .find(|row| row.status == status)
                .map_or(0, |row| row.count),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_zero_fill_gaps() {
        let rows = vec![
            DailySales {
                date: day(2),
                revenue: Decimal::new(1999, 2),
                orders: 1,
            },
            DailySales {
                date: day(5),
                revenue: Decimal::new(5000, 2),
                orders: 2,
            },
        ];

        let series = zero_fill(&rows, day(5), 5);

        let dates: Vec<NaiveDate> = series.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3), day(4), day(5)]);
        let orders: Vec<i64> = series.iter().map(|s| s.orders).collect();
        assert_eq!(orders, vec![0, 1, 0, 0, 2]);
        assert_eq!(series.get(2).map(|s| s.revenue), Some(Decimal::ZERO));
    }

    #[test]
    fn test_zero_fill_single_day() {
        let series = zero_fill(&[], day(10), 1);
        assert_eq!(series.len(), 1);
        assert_eq!(series.first().map(|s| s.date), Some(day(10)));
    }

    #[test]
    fn test_zero_fill_ignores_rows_outside_window() {
        let rows = vec![DailySales {
            date: day(1),
            revenue: Decimal::ONE,
            orders: 1,
        }];
        let series = zero_fill(&rows, day(10), 3);
        assert!(series.iter().all(|s| s.orders == 0));
    }

    #[test]
    fn test_average_order_value() {
        assert_eq!(average_order_value(Decimal::ZERO, 0), Decimal::ZERO);
        assert_eq!(
            average_order_value(Decimal::new(10000, 2), 3),
            Decimal::new(3333, 2)
        );
        assert_eq!(
            average_order_value(Decimal::new(5000, 2), 2),
            Decimal::new(2500, 2)
        );
    }

    #[test]
    fn test_status_counts_fill_all_statuses() {
        let rows = vec![
            StatusCount {
                status: OrderStatus::Paid,
                count: 4,
            },
            StatusCount {
                status: OrderStatus::Cancelled,
                count: 1,
            },
        ];

        let counts = status_counts(&rows);

        assert_eq!(counts.len(), OrderStatus::ALL.len());
        assert_eq!(counts.first().map(|c| (c.status, c.count)), Some((OrderStatus::Pending, 0)));
        assert_eq!(
            counts.iter().find(|c| c.status == OrderStatus::Paid).map(|c| c.count),
            Some(4)
        );
    }

    #[test]
    fn test_parameter_ranges() {
        assert!(check_range("days", 1, &SALES_DAYS).is_ok());
        assert!(check_range("days", 365, &SALES_DAYS).is_ok());
        assert!(check_range("days", 0, &SALES_DAYS).is_err());
        assert!(check_range("limit", 51, &LIST_LIMIT).is_err());
    }
}
