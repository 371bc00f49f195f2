//! Order service: history, cancellation, fulfilment status and invoices.

use sqlx::PgPool;
use thiserror::Error;

use emporium_core::{OrderId, OrderStatus, UserId};

use crate::config::StoreConfig;
use crate::crypto::Sealer;
use crate::db::{OrderRepository, RepositoryError, UserRepository};
use crate::invoice::{InvoiceData, InvoiceError, InvoiceLine, render_invoice};
use crate::models::{
    AddressDetails, CurrentUser, Order, OrderDetail, OrderItem, OrderWithCustomer, Page,
    Pagination, User,
};
use crate::stripe::{StripeClient, StripeError};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    /// The order belongs to someone else.
    #[error("you do not have access to this order")]
    Forbidden,

    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order can no longer be cancelled (status: {0})")]
    NotCancellable(OrderStatus),

    /// The order changed while it was being updated.
    #[error("{0}")]
    Conflict(String),

    #[error("payment provider error: {0}")]
    Stripe(#[from] StripeError),

    #[error("invoice error: {0}")]
    Invoice(#[from] InvoiceError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A rendered invoice.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub filename: String,
    pub pdf: Vec<u8>,
}

/// Order service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    users: UserRepository<'a>,
    sealer: &'a Sealer,
    stripe: &'a StripeClient,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, sealer: &'a Sealer, stripe: &'a StripeClient) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            users: UserRepository::new(pool),
            sealer,
            stripe,
        }
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<Page<Order>, OrderError> {
        let (orders, total) = self.orders.list_for_user(user_id, pagination).await?;
        Ok(Page::new(orders, pagination, total))
    }

    /// Every order, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<Page<OrderWithCustomer>, OrderError> {
        let (orders, total) = self.orders.list_all(status, pagination).await?;
        Ok(Page::new(orders, pagination, total))
    }

    /// An order with its items, visible to its owner and admins.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::Forbidden`.
    pub async fn detail(&self, viewer: &CurrentUser, id: OrderId) -> Result<OrderDetail, OrderError> {
        let order = self.visible_order(viewer, id).await?;
        let items = self.orders.items(order.id).await?;
        let shipping_address = self.shipping_address(&order);

        Ok(OrderDetail {
            order,
            items,
            shipping_address,
        })
    }

    /// Cancel an own order while it is pending or paid.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotCancellable` once the order has shipped.
    pub async fn cancel(&self, viewer: &CurrentUser, id: OrderId) -> Result<Order, OrderError> {
        let order = self.get(id).await?;
        if order.user_id != viewer.id {
            return Err(OrderError::Forbidden);
        }
        if !order.status.is_cancellable() {
            return Err(OrderError::NotCancellable(order.status));
        }

        self.cancel_order(order, viewer.id).await
    }

    /// Move an order along its lifecycle. Cancelling refunds and restocks.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` for a transition the lifecycle
    /// does not allow.
    pub async fn set_status(
        &self,
        actor: UserId,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = self.get(id).await?;
        if !order.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to,
            });
        }

        if to == OrderStatus::Cancelled {
            return self.cancel_order(order, actor).await;
        }

        let updated = self
            .orders
            .update_status(id, order.status, to)
            .await
            .map_err(conflict)?;

        tracing::info!(
            order_id = %id,
            actor = %actor,
            from = %order.status,
            to = %to,
            "Order status changed"
        );

        Ok(updated)
    }

    /// Render the PDF invoice of an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::Forbidden`, or
    /// `OrderError::Invoice` if rendering fails.
    pub async fn invoice(
        &self,
        viewer: &CurrentUser,
        id: OrderId,
        store: &StoreConfig,
    ) -> Result<Invoice, OrderError> {
        let order = self.visible_order(viewer, id).await?;
        let items = self.orders.items(order.id).await?;
        let customer = order_customer(&order, self.users.get_by_id(order.user_id).await?)?;
        let address = self.shipping_address(&order);

        let data = invoice_data(&order, &items, &customer, address.as_ref(), store);
        let filename = format!("invoice-{}.pdf", data.order_number);
        let pdf = render_invoice(&data)?;

        Ok(Invoice { filename, pdf })
    }

    async fn get(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders.get(id).await?.ok_or(OrderError::NotFound)
    }

    async fn visible_order(&self, viewer: &CurrentUser, id: OrderId) -> Result<Order, OrderError> {
        let order = self.get(id).await?;
        if !viewer.can_access(order.user_id) {
            return Err(OrderError::Forbidden);
        }
        Ok(order)
    }

    fn shipping_address(&self, order: &Order) -> Option<AddressDetails> {
        match self.sealer.open::<AddressDetails>(&order.shipping_snapshot) {
            Ok(address) => Some(address),
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Cannot open shipping snapshot");
                None
            }
        }
    }

    /// Refund a paid order, then cancel it and restock in one transaction.
    async fn cancel_order(&self, order: Order, actor: UserId) -> Result<Order, OrderError> {
        if let (OrderStatus::Paid, Some(intent)) =
            (order.status, order.stripe_payment_intent_id.as_deref())
        {
            let refund = self.stripe.refund(intent).await?;
            tracing::info!(order_id = %order.id, refund = %refund.id, "Order refunded");
        }

        let cancelled = self
            .orders
            .cancel_and_restock(order.id, order.status)
            .await
            .map_err(|e| {
                if order.status == OrderStatus::Paid {
                    tracing::error!(
                        order_id = %order.id,
                        error = %e,
                        "Order refunded but could not be cancelled"
                    );
                }
                conflict(e)
            })?;

        tracing::info!(order_id = %order.id, actor = %actor, "Order cancelled");

        Ok(cancelled)
    }
}

fn conflict(err: RepositoryError) -> OrderError {
    match err {
        RepositoryError::Conflict(message) => OrderError::Conflict(message),
        RepositoryError::NotFound => OrderError::NotFound,
        other => OrderError::Repository(other),
    }
}

/// The customer row an order points at. Orders keep their user, so a
/// missing row means the database is inconsistent.
fn order_customer(order: &Order, customer: Option<User>) -> Result<User, RepositoryError> {
    customer.ok_or_else(|| {
        RepositoryError::DataCorruption(format!("order {} has no customer", order.id))
    })
}

/// Collect what goes on an invoice.
#[must_use]
pub fn invoice_data(
    order: &Order,
    items: &[OrderItem],
    customer: &User,
    address: Option<&AddressDetails>,
    store: &StoreConfig,
) -> InvoiceData {
    InvoiceData {
        store_name: store.name.clone(),
        store_address: store.address_lines.clone(),
        order_number: order.display_number(),
        order_date: order.created_at,
        status: order.status,
        customer_name: customer.name.clone(),
        customer_email: customer.email.as_str().to_string(),
        shipping_address: address.map(AddressDetails::lines).unwrap_or_default(),
        items: items
            .iter()
            .map(|item| InvoiceLine {
                name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total,
            })
            .collect(),
        subtotal: order.subtotal,
        shipping: order.shipping,
        tax: order.tax,
        total: order.total,
        currency: order.currency.parse().unwrap_or_default(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use emporium_core::{
        AddressId, CurrencyCode, Email, OrderItemId, PaymentInfoId, ProductId, UserRole,
    };

    use super::*;

    fn order() -> Order {
        Order {
            id: OrderId::new(12),
            user_id: UserId::new(3),
            address_id: AddressId::new(1),
            payment_info_id: Some(PaymentInfoId::new(1)),
            order_number: Some("ORD-20260101-12".to_string()),
            status: OrderStatus::Paid,
            subtotal: Decimal::new(2000, 2),
            shipping: Decimal::new(500, 2),
            tax: Decimal::ZERO,
            total: Decimal::new(2500, 2),
            currency: "EUR".to_string(),
            stripe_payment_intent_id: Some("pi_1".to_string()),
            shipping_snapshot: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn customer() -> User {
        User {
            id: UserId::new(3),
            email: Email::parse("ada@example.com").unwrap(),
            name: "Ada".to_string(),
            role: UserRole::Customer,
            is_active: true,
            stripe_customer_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_invoice_data_copies_order() {
        let items = vec![OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(12),
            product_id: ProductId::new(5),
            product_name: "Kettle".to_string(),
            unit_price: Decimal::new(1000, 2),
            quantity: 2,
            line_total: Decimal::new(2000, 2),
        }];
        let store = StoreConfig::default();

        let data = invoice_data(&order(), &items, &customer(), None, &store);

        assert_eq!(data.order_number, "ORD-20260101-12");
        assert_eq!(data.currency, CurrencyCode::EUR);
        assert_eq!(data.customer_email, "ada@example.com");
        assert!(data.shipping_address.is_empty());
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.total, Decimal::new(2500, 2));
    }

    #[test]
    fn test_order_customer_missing_is_corruption() {
        let err = order_customer(&order(), None).unwrap_err();
        assert!(
            matches!(&err, RepositoryError::DataCorruption(msg) if msg == "order 12 has no customer")
        );
        assert!(matches!(
            OrderError::from(err),
            OrderError::Repository(RepositoryError::DataCorruption(_))
        ));

        let found = order_customer(&order(), Some(customer())).unwrap();
        assert_eq!(found.id, UserId::new(3));
    }
}
