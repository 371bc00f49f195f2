//! Checkout route handlers.

use axum::{Json, extract::State, http::StatusCode};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::OrderDetail;
use crate::services::checkout::{CheckoutRequest, CheckoutReview, CheckoutService};
use crate::state::AppState;

fn checkout<'a>(state: &'a AppState, session: &'a Session) -> CheckoutService<'a> {
    CheckoutService::new(
        state.pool(),
        session,
        state.sealer(),
        state.stripe(),
        &state.config().commerce,
    )
}

/// Price the cart for the chosen address and card without side effects.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutReview>> {
    Ok(Json(checkout(&state, &session).review(user.id, body).await?))
}

/// Charge the card and place the order.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    let order = checkout(&state, &session).confirm(user.id, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{json, send};

    #[tokio::test]
    async fn test_checkout_requires_auth() {
        let body = json!({"address_id": 1, "payment_info_id": 1});
        for uri in ["/api/checkout/review", "/api/checkout/confirm"] {
            let response = send(json("POST", uri, &body)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
