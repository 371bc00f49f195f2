//! Public catalog route handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::models::{Category, CategoryWithProducts, Page, PageParams, Product, ProductFilter};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Product listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Category slug.
    pub category: Option<String>,
    pub q: Option<String>,
    pub featured: Option<bool>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        Self {
            category: query.category.filter(|s| !s.trim().is_empty()),
            search: query.q.filter(|s| !s.trim().is_empty()),
            featured: query.featured,
        }
    }
}

/// Active categories by name.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Arc<Vec<Category>>>> {
    let categories = CatalogService::new(state.pool(), state.catalog_cache())
        .active_categories()
        .await?;
    Ok(Json(categories))
}

/// An active category with its visible products.
#[instrument(skip(state))]
pub async fn category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Arc<CategoryWithProducts>>> {
    let page = CatalogService::new(state.pool(), state.catalog_cache())
        .category_page(&slug)
        .await?;
    Ok(Json(page))
}

/// Visible products, newest first.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let page = CatalogService::new(state.pool(), state.catalog_cache())
        .visible_products(&query.into(), params.into())
        .await?;
    Ok(Json(page))
}

/// A visible product.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.pool(), state.catalog_cache())
        .visible_product(&slug)
        .await?;
    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_filters_are_dropped() {
        let filter = ProductFilter::from(ProductQuery {
            category: Some("  ".to_string()),
            q: Some("kettle".to_string()),
            featured: Some(true),
        });
        assert_eq!(filter.category, None);
        assert_eq!(filter.search.as_deref(), Some("kettle"));
        assert_eq!(filter.featured, Some(true));
    }
}
