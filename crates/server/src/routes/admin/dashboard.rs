//! Back-office analytics handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::OrderWithCustomer;
use crate::models::dashboard::{
    CategorySales, DailySales, DashboardSummary, StatusCount, TopProduct,
};
use crate::services::dashboard::DashboardService;
use crate::state::AppState;

/// `?days=` for the sales series.
#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

const fn default_days() -> u32 {
    30
}

/// `?limit=` for top products.
#[derive(Debug, Deserialize)]
pub struct TopProductsQuery {
    #[serde(default = "default_top_products")]
    pub limit: u32,
}

const fn default_top_products() -> u32 {
    5
}

/// `?limit=` for recent orders.
#[derive(Debug, Deserialize)]
pub struct RecentOrdersQuery {
    #[serde(default = "default_recent_orders")]
    pub limit: u32,
}

const fn default_recent_orders() -> u32 {
    10
}

/// Headline counters.
#[instrument(skip(state, _admin))]
pub async fn summary(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardSummary>> {
    Ok(Json(DashboardService::new(state.pool()).summary().await?))
}

/// Daily revenue series.
#[instrument(skip(state, _admin))]
pub async fn sales(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<SalesQuery>,
) -> Result<Json<Vec<DailySales>>> {
    Ok(Json(
        DashboardService::new(state.pool()).sales(query.days).await?,
    ))
}

/// Best sellers.
#[instrument(skip(state, _admin))]
pub async fn top_products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<TopProductsQuery>,
) -> Result<Json<Vec<TopProduct>>> {
    Ok(Json(
        DashboardService::new(state.pool())
            .top_products(query.limit)
            .await?,
    ))
}

/// Order count per status.
#[instrument(skip(state, _admin))]
pub async fn orders_by_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<StatusCount>>> {
    Ok(Json(
        DashboardService::new(state.pool()).orders_by_status().await?,
    ))
}

/// Revenue per category.
#[instrument(skip(state, _admin))]
pub async fn sales_by_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<CategorySales>>> {
    Ok(Json(
        DashboardService::new(state.pool()).sales_by_category().await?,
    ))
}

/// Latest orders.
#[instrument(skip(state, _admin))]
pub async fn recent_orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<RecentOrdersQuery>,
) -> Result<Json<Vec<OrderWithCustomer>>> {
    Ok(Json(
        DashboardService::new(state.pool())
            .recent_orders(query.limit)
            .await?,
    ))
}
