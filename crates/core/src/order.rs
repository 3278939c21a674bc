//! Orders, order confirmations and merchant payment accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::money::lenient;
use crate::types::{Money, OrderId, OrderStatus, PaymentAccountId, PaymentMethod, PaymentStatus};

/// Backend response to a successful order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_number: String,
    /// Amount charged, as computed by the backend.
    #[serde(default, with = "lenient")]
    pub total_amount: Money,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Non-fatal notes from the backend, e.g. a total mismatch.
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One line of a placed order. Variant names are display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
    #[serde(with = "lenient")]
    pub unit_price: Money,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A status change recorded against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(with = "lenient")]
    pub total_amount: Money,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    pub ordered_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub updates: Vec<OrderUpdate>,
}

impl Order {
    /// Total number of units ordered.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// A merchant account customers send mobile payments to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAccount {
    pub id: PaymentAccountId,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub account_number: String,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// The account to preselect: the first active one, else the first listed.
#[must_use]
pub fn default_account(accounts: &[PaymentAccount]) -> Option<&PaymentAccount> {
    accounts
        .iter()
        .find(|a| a.is_active)
        .or_else(|| accounts.first())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_defaults() {
        let confirmation: OrderConfirmation =
            serde_json::from_str(r#"{"order_number": "ORD-1001", "total_amount": "108.96"}"#)
                .unwrap();
        assert_eq!(confirmation.total_amount, Money::from_cents(10896));
        assert_eq!(confirmation.status, OrderStatus::Pending);
        assert_eq!(confirmation.payment_status, PaymentStatus::Unpaid);
        assert!(confirmation.warnings.is_empty());
    }

    #[test]
    fn test_order_detail() {
        let order: Order = serde_json::from_str(
            r#"{
                "id": 5,
                "order_number": "ORD-5",
                "total_amount": "74.98",
                "status": "SHIPPED",
                "payment_status": "PAID",
                "ordered_at": "2024-03-01T10:00:00Z",
                "items": [
                    {"product": "Shirt", "color": "Navy", "size": null, "quantity": 2, "unit_price": "29.99"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.unit_count(), 2);
        assert_eq!(order.items[0].line_total(), Money::from_cents(5998));
    }

    #[test]
    fn test_default_account_prefers_active() {
        let accounts: Vec<PaymentAccount> = serde_json::from_str(
            r#"[
                {"id": 1, "payment_method": "nagad", "account_number": "0171", "is_active": false},
                {"id": 2, "payment_method": "bkash", "account_number": "0181"}
            ]"#,
        )
        .unwrap();
        assert_eq!(default_account(&accounts).unwrap().id.as_i64(), 2);
        assert!(default_account(&[]).is_none());
    }
}
