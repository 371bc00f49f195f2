//! Orders and their line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use emporium_core::{
    AddressId, Email, OrderId, OrderItemId, OrderStatus, PaymentInfoId, ProductId, UserId,
};

use super::account::AddressDetails;

/// A placed order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub payment_info_id: Option<PaymentInfoId>,
    /// `ORD-YYYYMMDD-<id>`, assigned right after insert.
    pub order_number: Option<String>,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
    #[serde(skip_serializing)]
    pub stripe_payment_intent_id: Option<String>,
    /// Sealed copy of the shipping address at purchase time.
    #[serde(skip_serializing)]
    pub shipping_snapshot: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Human readable order number, falling back to the numeric id.
    #[must_use]
    pub fn display_number(&self) -> String {
        self.order_number
            .clone()
            .unwrap_or_else(|| format_order_number(self.created_at, self.id))
    }
}

/// Build the human readable order number for an order.
#[must_use]
pub fn format_order_number(created_at: DateTime<Utc>, id: OrderId) -> String {
    format!("ORD-{}-{}", created_at.format("%Y%m%d"), id)
}

/// A line of an order with name and price snapshots.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Order with its items and opened shipping address.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// `None` when the snapshot can no longer be opened (rotated key).
    pub shipping_address: Option<AddressDetails>,
}

/// Order row for back-office listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderWithCustomer {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub customer_email: Email,
    pub customer_name: String,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format_order_number() {
        let created = Utc.with_ymd_and_hms(2026, 3, 7, 15, 0, 0).single();
        let created = created.unwrap_or_default();
        assert_eq!(
            format_order_number(created, OrderId::new(42)),
            "ORD-20260307-42"
        );
    }
}
