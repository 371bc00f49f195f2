//! Address and payment sealing endpoints.
//!
//! Thin wrappers around `Sealer`: the client gets back an opaque token it
//! can hand back later. Tokens that fail to open are a 400.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{AddressDetails, PaymentDetails};
use crate::state::AppState;

/// Address to seal.
#[derive(Debug, Deserialize)]
pub struct SealAddressRequest {
    pub address: AddressDetails,
}

/// Card details to seal.
#[derive(Debug, Deserialize)]
pub struct SealPaymentRequest {
    pub payment: PaymentDetails,
}

/// Token to open.
#[derive(Debug, Deserialize)]
pub struct OpenRequest {
    pub token: String,
}

/// A sealed value.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// An opened address.
#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub address: AddressDetails,
}

/// Opened card details.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: PaymentDetails,
}

/// Seal an address.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn encrypt_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<SealAddressRequest>,
) -> Result<Json<TokenResponse>> {
    body.address.validate().map_err(AppError::BadRequest)?;
    let token = state
        .sealer()
        .seal(&body.address)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(TokenResponse { token }))
}

/// Open a sealed address.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn decrypt_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<OpenRequest>,
) -> Result<Json<AddressResponse>> {
    let address = state.sealer().open(&body.token)?;
    Ok(Json(AddressResponse { address }))
}

/// Seal card display details.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn encrypt_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<SealPaymentRequest>,
) -> Result<Json<TokenResponse>> {
    body.payment.validate().map_err(AppError::BadRequest)?;
    let token = state
        .sealer()
        .seal(&body.payment)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(TokenResponse { token }))
}

/// Open sealed card details.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn decrypt_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<OpenRequest>,
) -> Result<Json<PaymentResponse>> {
    let payment = state.sealer().open(&body.token)?;
    Ok(Json(PaymentResponse { payment }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{json, send};

    #[tokio::test]
    async fn test_sealing_requires_auth() {
        let response = send(json(
            "POST",
            "/api/secure/address/decrypt",
            &json!({"token": "abc"}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
