//! Cart route handlers.
//!
//! The cart lives in the session, so anonymous shoppers can fill it before
//! signing in.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use emporium_core::ProductId;

use crate::error::{Result, add_breadcrumb};
use crate::models::CartView;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Add-to-cart body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Quantity update body. Zero removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

fn cart<'a>(state: &'a AppState, session: &'a Session) -> CartService<'a> {
    CartService::new(state.pool(), session, state.config().commerce.currency)
}

/// The priced cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    Ok(Json(cart(&state, &session).view().await?))
}

/// Add units of a product.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let view = cart(&state, &session)
        .add(body.product_id, body.quantity)
        .await?;

    let product_id = body.product_id.to_string();
    add_breadcrumb("cart", "Added product", Some(&[("product_id", &product_id)]));

    Ok(Json(view))
}

/// Set a line's quantity.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let view = cart(&state, &session)
        .set_quantity(product_id, body.quantity)
        .await?;
    Ok(Json(view))
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    Ok(Json(cart(&state, &session).remove(product_id).await?))
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    cart(&state, &session).clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{body_json, get, json, send};

    #[tokio::test]
    async fn test_empty_cart_without_database() {
        let response = send(get("/api/cart")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["item_count"], 0);
        assert_eq!(body["subtotal"], "0");
        assert_eq!(body["currency"], "USD");
    }

    #[tokio::test]
    async fn test_update_missing_line_is_not_found() {
        let response = send(json("PATCH", "/api/cart/items/3", &json!({"quantity": 2}))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_remove_missing_line_is_not_found() {
        let response = send(
            axum::http::Request::builder()
                .method("DELETE")
                .uri("/api/cart/items/3")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
