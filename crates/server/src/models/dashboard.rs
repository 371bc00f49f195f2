//! Back-office analytics shapes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use emporium_core::{CategoryId, OrderStatus, ProductId};

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub revenue: Decimal,
    pub orders: i64,
    pub average_order_value: Decimal,
    pub customers: i64,
    pub products: i64,
    pub low_stock: i64,
    pub unread_messages: i64,
}

/// Revenue and order count for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailySales {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub orders: i64,
}

/// Best seller by units.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

/// Number of orders in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Revenue attributed to a category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategorySales {
    pub category_id: CategoryId,
    pub name: String,
    pub revenue: Decimal,
    pub units_sold: i64,
}
