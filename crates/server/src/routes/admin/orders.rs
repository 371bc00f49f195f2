//! Back-office order management and invoices.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::{OrderId, OrderStatus};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Order, OrderDetail, OrderWithCustomer, Page, PageParams};
use crate::routes::orders::{Disposition, pdf_response};
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Order list filter.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

fn orders(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.pool(), state.sealer(), state.stripe())
}

/// Every order, newest first.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PageParams>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Page<OrderWithCustomer>>> {
    Ok(Json(
        orders(&state).list_all(query.status, params.into()).await?,
    ))
}

/// Any order with its items.
#[instrument(skip(state, admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(orders(&state).detail(&admin, id).await?))
}

/// Move an order along its lifecycle.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Order>> {
    Ok(Json(orders(&state).set_status(admin.id, id, body.status).await?))
}

/// Invoice PDF shown inline.
#[instrument(skip(state, admin))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let invoice = orders(&state)
        .invoice(&admin, id, &state.config().store)
        .await?;
    Ok(pdf_response(invoice, Disposition::Inline))
}
