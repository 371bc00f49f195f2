//! Account route handlers: saved addresses and cards.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::{AddressId, PaymentInfoId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Address, PaymentMethod};
use crate::services::account::{AccountService, AddressInput};
use crate::state::AppState;

/// Body for saving a card already collected by Stripe.js.
#[derive(Debug, Deserialize)]
pub struct AddPaymentMethodRequest {
    pub payment_method_id: String,
}

fn account(state: &AppState) -> AccountService<'_> {
    AccountService::new(state.pool(), state.sealer(), state.stripe())
}

// =============================================================================
// Addresses
// =============================================================================

/// Saved addresses, default first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(account(&state).addresses(user.id).await?))
}

/// Save a new address.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = account(&state).create_address(user.id, &body).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// Replace an address.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(body): Json<AddressInput>,
) -> Result<Json<Address>> {
    Ok(Json(account(&state).update_address(user.id, id, &body).await?))
}

/// Make an address the default.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn default_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    Ok(Json(account(&state).set_default_address(user.id, id).await?))
}

/// Delete an address not used by any order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    account(&state).delete_address(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Payment methods
// =============================================================================

/// Saved cards, default first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn payment_methods(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<PaymentMethod>>> {
    Ok(Json(account(&state).payment_methods(user.id).await?))
}

/// Attach a Stripe payment method to the user and save its card details.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn add_payment_method(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddPaymentMethodRequest>,
) -> Result<(StatusCode, Json<PaymentMethod>)> {
    let method = account(&state)
        .add_payment_method(user.id, &body.payment_method_id)
        .await?;
    Ok((StatusCode::CREATED, Json(method)))
}

/// Make a card the default.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn default_payment_method(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PaymentInfoId>,
) -> Result<Json<PaymentMethod>> {
    Ok(Json(
        account(&state).set_default_payment_method(user.id, id).await?,
    ))
}

/// Detach a card in Stripe and forget it.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_payment_method(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PaymentInfoId>,
) -> Result<StatusCode> {
    account(&state).delete_payment_method(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::super::test_support::{get, send};

    #[tokio::test]
    async fn test_account_requires_auth() {
        for uri in ["/api/account/addresses", "/api/account/payment-methods"] {
            let response = send(get(uri)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
