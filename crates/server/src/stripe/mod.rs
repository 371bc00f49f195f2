//! Stripe REST API client.
//!
//! Covers the calls the checkout needs: customers, payment method
//! attach/detach/retrieve, `PaymentIntent` creation and refunds. Requests are
//! form encoded and authenticated with the secret key as a bearer token.

pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use crate::config::StripeConfig;

pub use types::{Card, Customer, PaymentIntent, PaymentIntentStatus, PaymentMethod, Refund};

use types::ErrorResponse;

/// Errors that can occur when calling Stripe.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The card was declined or could not be charged.
    #[error("card error: {0}")]
    Card(String),

    /// The referenced object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    /// Create a customer for a store user.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, email, name))]
    pub async fn create_customer(
        &self,
        email: &str,
        name: &str,
        user_id: i32,
    ) -> Result<Customer, StripeError> {
        let user_id = user_id.to_string();
        self.post(
            "/customers",
            &[
                ("email", email),
                ("name", name),
                ("metadata[user_id]", user_id.as_str()),
            ],
            None,
        )
        .await
    }

    /// Fetch a payment method.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::NotFound` for unknown ids.
    #[instrument(skip(self))]
    pub async fn retrieve_payment_method(&self, id: &str) -> Result<PaymentMethod, StripeError> {
        self.get(&format!("/payment_methods/{id}")).await
    }

    /// Attach a payment method to a customer.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Card` if Stripe rejects the card.
    #[instrument(skip(self))]
    pub async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<PaymentMethod, StripeError> {
        self.post(
            &format!("/payment_methods/{payment_method_id}/attach"),
            &[("customer", customer_id)],
            None,
        )
        .await
    }

    /// Detach a payment method from its customer.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn detach_payment_method(
        &self,
        payment_method_id: &str,
    ) -> Result<PaymentMethod, StripeError> {
        self.post(
            &format!("/payment_methods/{payment_method_id}/detach"),
            &[],
            None,
        )
        .await
    }

    /// Charge a saved card off-session and confirm immediately.
    ///
    /// `idempotency_key` makes retries of the same checkout safe.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Card` when the card is declined.
    #[instrument(skip(self, idempotency_key))]
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        customer_id: &str,
        payment_method_id: &str,
        order_reference: &str,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, StripeError> {
        let amount = amount_minor.to_string();
        let currency = currency.to_ascii_lowercase();
        self.post(
            "/payment_intents",
            &[
                ("amount", amount.as_str()),
                ("currency", currency.as_str()),
                ("customer", customer_id),
                ("payment_method", payment_method_id),
                ("confirm", "true"),
                ("off_session", "true"),
                ("metadata[reference]", order_reference),
            ],
            Some(idempotency_key),
        )
        .await
    }

    /// Refund a `PaymentIntent` in full.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn refund(&self, payment_intent_id: &str) -> Result<Refund, StripeError> {
        self.post(
            "/refunds",
            &[("payment_intent", payment_intent_id)],
            Some(&format!("refund-{payment_intent_id}")),
        )
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StripeError> {
        let response = self
            .client
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeError> {
        let mut request = self
            .client
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StripeError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = classify_error(status.as_u16(), &body);
            tracing::warn!(status = %status, error = %error, "Stripe request failed");
            return Err(error);
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Stripe response"
            );
            StripeError::Parse(e.to_string())
        })
    }
}

/// Turn a non-success response into a typed error.
fn classify_error(status: u16, body: &str) -> StripeError {
    let error = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.error)
        .unwrap_or_default();
    let message = error
        .message
        .clone()
        .unwrap_or_else(|| body.chars().take(200).collect());

    if status == 402 || error.kind.as_deref() == Some("card_error") {
        return StripeError::Card(message);
    }
    if status == 404 || error.code.as_deref() == Some("resource_missing") {
        return StripeError::NotFound(message);
    }
    StripeError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_card_decline() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#;
        match classify_error(402, body) {
            StripeError::Card(message) => assert_eq!(message, "Your card was declined."),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_missing_resource() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such PaymentMethod"}}"#;
        assert!(matches!(
            classify_error(400, body),
            StripeError::NotFound(_)
        ));
    }

    #[test]
    fn test_classify_unparseable_body() {
        match classify_error(500, "upstream exploded") {
            StripeError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_payment_intent_deserializes() {
        let body = r#"{"id":"pi_1","object":"payment_intent","status":"succeeded","amount":2599,"currency":"usd","last_payment_error":null}"#;
        let intent: PaymentIntent = serde_json::from_str(body).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(intent.status, PaymentIntentStatus::Succeeded);
        assert_eq!(intent.amount, 2599);
    }
}
