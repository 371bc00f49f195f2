//! Checkout service: review totals and place orders.
//!
//! The flow is address, payment, review, confirm. Review has no side effects.
//! Confirm charges the saved card off-session, then writes the order, its
//! items and the stock decrements in one transaction. If the order cannot be
//! written after the charge succeeded, the charge is refunded. A repeated
//! submission reuses the Stripe idempotency key and gets the first order back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;
use uuid::Uuid;

use emporium_core::{
    AddressId, OrderId, OrderStatus, PaymentInfoId, Price, ProductId, UserId, round_money,
};

use super::account::{AccountError, AccountService, open_address};
use super::cart::{CartError, CartService};
use crate::config::CommerceConfig;
use crate::crypto::{CryptoError, Sealer};
use crate::db::orders::{NewOrder, NewOrderItem};
use crate::db::{AddressRepository, OrderRepository, PaymentMethodRepository, RepositoryError};
use crate::models::{Address, CartViewLine, OrderDetail, PaymentMethod, session_keys};
use crate::stripe::{PaymentIntentStatus, StripeClient, StripeError};

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("address not found")]
    AddressNotFound,

    #[error("payment method not found")]
    PaymentMethodNotFound,

    /// Products in the cart were removed from sale since it was filled.
    #[error("some products in the cart are no longer available")]
    ProductsUnavailable(Vec<ProductId>),

    /// Stock no longer covers a cart line.
    #[error("not enough stock for {0}")]
    OutOfStock(String),

    /// The card was declined or needs the customer present.
    #[error("payment failed: {0}")]
    PaymentDeclined(String),

    /// Stock ran out between payment and order creation; the charge was refunded.
    #[error("{0}; the payment has been refunded")]
    StockConflict(String),

    #[error("order total cannot be charged")]
    InvalidAmount,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("sealing error: {0}")]
    Sealing(#[from] CryptoError),

    #[error("payment provider error: {0}")]
    Stripe(#[from] StripeError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Address and card chosen for checkout.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CheckoutRequest {
    pub address_id: AddressId,
    pub payment_info_id: PaymentInfoId,
}

/// Order amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Apply shipping and tax rules to a subtotal.
///
/// Shipping is free at or above the threshold. Tax is rounded half-to-even to
/// two decimal places.
#[must_use]
pub fn compute_totals(subtotal: Decimal, commerce: &CommerceConfig) -> Totals {
    let shipping = if subtotal >= commerce.free_shipping_threshold {
        Decimal::ZERO
    } else {
        commerce.flat_shipping
    };
    let tax = round_money(subtotal * commerce.tax_rate);

    Totals {
        subtotal,
        shipping,
        tax,
        total: subtotal + shipping + tax,
    }
}

/// Everything the shopper confirms before paying.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReview {
    pub address: Address,
    pub payment_method: PaymentMethod,
    pub lines: Vec<CartViewLine>,
    pub item_count: u32,
    pub currency: String,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Checkout service bound to one shopper session.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    session: &'a Session,
    sealer: &'a Sealer,
    stripe: &'a StripeClient,
    commerce: &'a CommerceConfig,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        session: &'a Session,
        sealer: &'a Sealer,
        stripe: &'a StripeClient,
        commerce: &'a CommerceConfig,
    ) -> Self {
        Self {
            pool,
            session,
            sealer,
            stripe,
            commerce,
        }
    }

    fn cart(&self) -> CartService<'a> {
        CartService::new(self.pool, self.session, self.commerce.currency)
    }

    /// Validate the selection and price the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart`, `AddressNotFound`,
    /// `PaymentMethodNotFound`, `ProductsUnavailable` or `OutOfStock` when the
    /// order cannot be placed as is.
    pub async fn review(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<CheckoutReview, CheckoutError> {
        let address = AddressRepository::new(self.pool)
            .get_for_user(request.address_id, user_id)
            .await?
            .ok_or(CheckoutError::AddressNotFound)?;
        let address = open_address(self.sealer, address)?;

        let payment_method = PaymentMethodRepository::new(self.pool)
            .get_for_user(request.payment_info_id, user_id)
            .await?
            .ok_or(CheckoutError::PaymentMethodNotFound)?;

        let (view, _) = self.cart().priced().await?;
        if !view.removed.is_empty() {
            return Err(CheckoutError::ProductsUnavailable(view.removed));
        }
        if view.lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if let Some(line) = view.lines.iter().find(|line| !line.in_stock) {
            return Err(CheckoutError::OutOfStock(line.name.clone()));
        }

        Ok(CheckoutReview {
            address,
            payment_method,
            totals: compute_totals(view.subtotal, self.commerce),
            item_count: view.item_count,
            currency: view.currency,
            lines: view.lines,
        })
    }

    /// Charge the card and place the order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::PaymentDeclined` if the charge fails and
    /// `CheckoutError::StockConflict` if stock ran out after payment.
    pub async fn confirm(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<OrderDetail, CheckoutError> {
        let review = self.review(user_id, request).await?;

        let amount = Price::new(review.totals.total, self.commerce.currency)
            .minor_units()
            .ok_or(CheckoutError::InvalidAmount)?;
        let customer_id = AccountService::new(self.pool, self.sealer, self.stripe)
            .stripe_customer(user_id)
            .await?;
        let orders = OrderRepository::new(self.pool);
        let previous_order = orders.latest_id_for_user(user_id).await?;
        let attempt = self
            .session
            .get::<u32>(session_keys::CHECKOUT_ATTEMPT)
            .await
            .ok()
            .flatten()
            .unwrap_or(0);

        let intent = self
            .stripe
            .create_payment_intent(
                amount,
                self.commerce.currency.code(),
                &customer_id,
                &review.payment_method.stripe_payment_method_id,
                &format!("user-{user_id}"),
                &idempotency_key(user_id, previous_order, attempt, &review),
            )
            .await
            .map_err(|e| match e {
                StripeError::Card(message) => CheckoutError::PaymentDeclined(message),
                other => CheckoutError::Stripe(other),
            });
        let intent = match intent {
            Ok(intent) => intent,
            Err(e) => {
                // Other failures keep the key, so a retry replays the same intent.
                if matches!(e, CheckoutError::PaymentDeclined(_)) {
                    self.record_failed_attempt(attempt).await;
                }
                return Err(e);
            }
        };

        match intent.status {
            PaymentIntentStatus::Succeeded => {}
            PaymentIntentStatus::RequiresAction => {
                self.record_failed_attempt(attempt).await;
                return Err(CheckoutError::PaymentDeclined(
                    "the card requires authentication; please use another card".to_string(),
                ));
            }
            status => {
                self.record_failed_attempt(attempt).await;
                tracing::warn!(payment_intent = %intent.id, ?status, "Payment not completed");
                let message = intent
                    .last_payment_error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "the payment was not completed".to_string());
                return Err(CheckoutError::PaymentDeclined(message));
            }
        }

        if let Some(detail) = self.existing_order(&intent.id, &review).await? {
            return Ok(detail);
        }

        let snapshot = self.sealer.seal(&review.address.details)?;
        let new_order = NewOrder {
            user_id,
            address_id: review.address.id,
            payment_info_id: review.payment_method.id,
            status: OrderStatus::Paid,
            subtotal: review.totals.subtotal,
            shipping: review.totals.shipping,
            tax: review.totals.tax,
            total: review.totals.total,
            currency: review.currency.clone(),
            stripe_payment_intent_id: Some(intent.id.clone()),
            shipping_snapshot: snapshot,
        };
        let items = order_items(&review.lines);

        let (order, items) = match orders.create(&new_order, &items).await {
            Ok(created) => created,
            Err(e) => {
                if let Ok(Some(detail)) = self.existing_order(&intent.id, &review).await {
                    return Ok(detail);
                }
                self.refund_after_failure(&intent.id).await;
                self.record_failed_attempt(attempt).await;
                return Err(match e {
                    RepositoryError::Conflict(message) => CheckoutError::StockConflict(message),
                    other => CheckoutError::Repository(other),
                });
            }
        };

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            total = %order.total,
            "Order placed"
        );

        if let Err(e) = self.cart().clear().await {
            tracing::warn!(error = %e, order_id = %order.id, "Failed to clear cart after order");
        }

        Ok(OrderDetail {
            order,
            items,
            shipping_address: Some(review.address.details),
        })
    }

    /// The order a concurrent or repeated submission already wrote for this
    /// PaymentIntent.
    async fn existing_order(
        &self,
        payment_intent_id: &str,
        review: &CheckoutReview,
    ) -> Result<Option<OrderDetail>, CheckoutError> {
        let orders = OrderRepository::new(self.pool);
        let Some(order) = orders.get_by_payment_intent(payment_intent_id).await? else {
            return Ok(None);
        };
        tracing::info!(
            order_id = %order.id,
            payment_intent = %payment_intent_id,
            "Repeated checkout submission, returning existing order"
        );
        let items = orders.items(order.id).await?;
        Ok(Some(OrderDetail {
            order,
            items,
            shipping_address: Some(review.address.details.clone()),
        }))
    }

    /// Move to a new idempotency key, since Stripe replays the failed result
    /// for the old one.
    async fn record_failed_attempt(&self, attempt: u32) {
        let next = attempt.wrapping_add(1);
        if let Err(e) = self.session.insert(session_keys::CHECKOUT_ATTEMPT, next).await {
            tracing::warn!(error = %e, "Failed to record checkout attempt");
        }
    }

        async fn refund_after_failure(&self, payment_intent_id: &str) {
        match self.stripe.refund(payment_intent_id).await {
            Ok(refund) => {
                tracing::warn!(
                    payment_intent = %payment_intent_id,
                    refund = %refund.id,
                    "Order failed after payment; charge refunded"
                );
            }
            Err(e) => {
                tracing::error!(
                    payment_intent = %payment_intent_id,
                    error = %e,
                    "Order failed after payment and the refund failed"
                );
            }
        }
    }
}

fn order_items(lines: &[CartViewLine]) -> Vec<NewOrderItem> {
    lines
        .iter()
        .map(|line| NewOrderItem {
            product_id: line.product_id,
            product_name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: i32::try_from(line.quantity).unwrap_or(i32::MAX),
            line_total: line.line_total,
        })
        .collect()
}

/// Stripe idempotency key for a checkout attempt.
///
/// Submitting the same cart with the same address and card twice yields the
/// same key, so Stripe returns the first PaymentIntent instead of charging
/// again. `previous_order` changes once an order is placed and `attempt` once
/// a charge fails or is refunded, so a later identical purchase gets a fresh
/// key.
fn idempotency_key(
    user_id: UserId,
    previous_order: Option<OrderId>,
    attempt: u32,
    review: &CheckoutReview,
) -> String {
    let mut lines: Vec<(ProductId, u32)> = review
        .lines
        .iter()
        .map(|line| (line.product_id, line.quantity))
        .collect();
    lines.sort_unstable();

    let material = format!(
        "{user_id}|{}|{attempt}|{}|{}|{}{}",
        previous_order.map_or_else(|| "none".to_string(), |id| id.to_string()),
        review.address.id,
        review.payment_method.id,
        review.totals.total,
        lines
            .iter()
            .map(|(product_id, quantity)| format!("|{product_id}x{quantity}"))
            .collect::<String>(),
    );

    format!(
        "checkout-{}",
        Uuid::new_v5(&Uuid::NAMESPACE_OID, material.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::AddressDetails;

    fn commerce(tax_rate: Decimal) -> CommerceConfig {
        CommerceConfig {
            tax_rate,
            ..CommerceConfig::default()
        }
    }

    #[test]
    fn test_flat_shipping_below_threshold() {
        let totals = compute_totals(Decimal::new(4999, 2), &commerce(Decimal::ZERO));
        assert_eq!(totals.shipping, Decimal::new(500, 2));
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(5499, 2));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let totals = compute_totals(Decimal::new(5000, 2), &commerce(Decimal::ZERO));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(5000, 2));
    }

    #[test]
    fn test_tax_rounds_half_even() {
        // 10.25 * 0.10 = 1.025 -> 1.02
        let totals = compute_totals(Decimal::new(1025, 2), &commerce(Decimal::new(10, 2)));
        assert_eq!(totals.tax, Decimal::new(102, 2));
        assert_eq!(
            totals.total,
            Decimal::new(1025, 2) + Decimal::new(500, 2) + Decimal::new(102, 2)
        );

        // 10.35 * 0.10 = 1.035 -> 1.04
        let totals = compute_totals(Decimal::new(1035, 2), &commerce(Decimal::new(10, 2)));
        assert_eq!(totals.tax, Decimal::new(104, 2));
    }

    fn line(product_id: i32, quantity: u32) -> CartViewLine {
        CartViewLine {
            product_id: ProductId::new(product_id),
            name: format!("Product {product_id}"),
            slug: format!("product-{product_id}"),
            image_url: None,
            unit_price: Decimal::new(1000, 2),
            quantity,
            line_total: Decimal::new(1000, 2) * Decimal::from(quantity),
            available: 50,
            in_stock: true,
        }
    }

    fn review(lines: Vec<CartViewLine>) -> CheckoutReview {
        let subtotal = lines.iter().map(|line| line.line_total).sum();
        CheckoutReview {
            address: Address {
                id: AddressId::new(2),
                label: "Home".to_string(),
                is_default: true,
                details: AddressDetails {
                    full_name: "Ada Lovelace".to_string(),
                    line1: "1 Analytical Way".to_string(),
                    line2: None,
                    city: "London".to_string(),
                    state: None,
                    postal_code: "N1 9GU".to_string(),
                    country: "GB".to_string(),
                    phone: None,
                },
                created_at: Utc::now(),
            },
            payment_method: PaymentMethod {
                id: PaymentInfoId::new(5),
                user_id: UserId::new(1),
                stripe_payment_method_id: "pm_card_visa".to_string(),
                brand: "visa".to_string(),
                last4: "4242".to_string(),
                exp_month: 12,
                exp_year: 2030,
                is_default: true,
                created_at: Utc::now(),
            },
            item_count: lines.iter().map(|line| line.quantity).sum(),
            currency: "USD".to_string(),
            totals: compute_totals(subtotal, &commerce(Decimal::ZERO)),
            lines,
        }
    }

    #[test]
    fn test_resubmitted_checkout_reuses_key() {
        let user = UserId::new(1);
        let previous = Some(OrderId::new(40));
        let first = idempotency_key(user, previous, 0, &review(vec![line(3, 1), line(7, 2)]));
        let again = idempotency_key(user, previous, 0, &review(vec![line(7, 2), line(3, 1)]));
        assert_eq!(first, again);
        assert!(first.starts_with("checkout-"));
    }

    #[test]
    fn test_changed_checkout_gets_new_key() {
        let user = UserId::new(1);
        let previous = Some(OrderId::new(40));
        let base = idempotency_key(user, previous, 0, &review(vec![line(3, 1)]));

        assert_ne!(base, idempotency_key(user, previous, 0, &review(vec![line(3, 2)])));
        assert_ne!(base, idempotency_key(UserId::new(9), previous, 0, &review(vec![line(3, 1)])));
        assert_ne!(
            base,
            idempotency_key(user, Some(OrderId::new(41)), 0, &review(vec![line(3, 1)]))
        );
        assert_ne!(base, idempotency_key(user, None, 0, &review(vec![line(3, 1)])));
        assert_ne!(base, idempotency_key(user, previous, 1, &review(vec![line(3, 1)])));
    }

    #[test]
    fn test_order_items_snapshot_lines() {
        let lines = vec![CartViewLine {
            product_id: ProductId::new(7),
            name: "Teapot".to_string(),
            slug: "teapot".to_string(),
            image_url: None,
            unit_price: Decimal::new(2500, 2),
            quantity: 2,
            line_total: Decimal::new(5000, 2),
            available: 9,
            in_stock: true,
        }];

        let items = order_items(&lines);
        let item = items.first();
        assert_eq!(item.map(|i| i.product_name.as_str()), Some("Teapot"));
        assert_eq!(item.map(|i| i.quantity), Some(2));
        assert_eq!(item.map(|i| i.line_total), Some(Decimal::new(5000, 2)));
    }
}
