//! Back-office catalog management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::{CategoryId, ProductId};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Category, Page, PageParams, Product};
use crate::services::catalog::{
    CatalogService, CategoryInput, CategoryStatusChange, ProductInput, ProductRemoval,
};
use crate::state::AppState;

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub is_active: bool,
}

/// Stock adjustment body.
#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub delta: i32,
}

/// Product list filter.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<CategoryId>,
}

/// Outcome of a product delete request.
#[derive(Debug, Serialize)]
pub struct RemovalResponse {
    pub result: ProductRemoval,
}

fn catalog(state: &AppState) -> CatalogService<'_> {
    CatalogService::new(state.pool(), state.catalog_cache())
}

// =============================================================================
// Categories
// =============================================================================

/// Every category.
#[instrument(skip(state, _admin))]
pub async fn categories(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog(&state).all_categories().await?))
}

/// One category.
#[instrument(skip(state, _admin))]
pub async fn category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    Ok(Json(catalog(&state).category(id).await?))
}

/// Create a category.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = catalog(&state).create_category(&body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Replace a category's fields.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(body): Json<CategoryInput>,
) -> Result<Json<Category>> {
    Ok(Json(catalog(&state).update_category(id, &body).await?))
}

/// Activate or deactivate a category and its products.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn category_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<CategoryStatusChange>> {
    Ok(Json(
        catalog(&state).set_category_status(id, body.is_active).await?,
    ))
}

/// Delete an empty category.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    catalog(&state).delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

/// Every product, including inactive ones.
#[instrument(skip(state, _admin))]
pub async fn products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PageParams>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    Ok(Json(
        catalog(&state)
            .all_products(query.category_id, params.into())
            .await?,
    ))
}

/// One product.
#[instrument(skip(state, _admin))]
pub async fn product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(catalog(&state).product(id).await?))
}

/// Create a product.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = catalog(&state).create_product(&body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductInput>,
) -> Result<Json<Product>> {
    Ok(Json(catalog(&state).update_product(id, &body).await?))
}

/// Activate or deactivate a product.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn product_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Product>> {
    Ok(Json(
        catalog(&state).set_product_status(id, body.is_active).await?,
    ))
}

/// Add or remove stock.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<StockRequest>,
) -> Result<Json<Product>> {
    Ok(Json(catalog(&state).adjust_stock(id, body.delta).await?))
}

/// Delete a product, or deactivate it when orders reference it.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<RemovalResponse>> {
    let result = catalog(&state).remove_product(id).await?;
    Ok(Json(RemovalResponse { result }))
}
