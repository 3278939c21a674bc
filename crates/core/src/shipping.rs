//! Shipping methods and tiered quotes.

use serde::{Deserialize, Serialize};

use crate::types::money::lenient;
use crate::types::{Money, ShippingMethodId};

/// A delivery option offered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    #[serde(alias = "title")]
    pub name: String,
    /// Base price; unparseable values read as zero.
    #[serde(default, with = "lenient")]
    pub price: Money,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        alias = "estimated_delivery_time",
        alias = "estimatedDeliveryTime"
    )]
    pub estimated_delivery: Option<String>,
    #[serde(default)]
    pub tracking_available: bool,
}

impl ShippingMethod {
    /// The same method priced at a quoted amount.
    #[must_use]
    pub fn priced_at(&self, price: Money) -> Self {
        Self {
            price,
            ..self.clone()
        }
    }
}

/// A price quote for shipping a number of items with one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    #[serde(with = "lenient")]
    pub price: Money,
    #[serde(default, with = "lenient")]
    pub base_price: Money,
    #[serde(default)]
    pub has_tiers: bool,
}

/// A shipping method with its price for a specific cart quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingOption {
    pub method: ShippingMethod,
    /// Price for `quantity` items.
    pub price: Money,
    pub base_price: Money,
    pub has_tiers: bool,
    pub quantity: u32,
}

impl ShippingOption {
    /// Option priced from a backend quote.
    #[must_use]
    pub const fn quoted(method: ShippingMethod, quote: &ShippingQuote, quantity: u32) -> Self {
        Self {
            price: quote.price,
            base_price: quote.base_price,
            has_tiers: quote.has_tiers,
            method,
            quantity,
        }
    }

    /// Option priced at the method's base price, used when quoting fails.
    #[must_use]
    pub const fn base(method: ShippingMethod, quantity: u32) -> Self {
        Self {
            price: method.price,
            base_price: method.price,
            has_tiers: false,
            method,
            quantity,
        }
    }

    /// The method carrying the quoted price, ready for checkout.
    #[must_use]
    pub fn to_method(&self) -> ShippingMethod {
        self.method.priced_at(self.price)
    }
}

/// Sort options cheapest first. The sort is stable, so ties keep backend order.
pub fn sort_by_price(options: &mut [ShippingOption]) {
    options.sort_by_key(|o| o.price);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn method(id: i64, cents: u32) -> ShippingMethod {
        ShippingMethod {
            id: ShippingMethodId::new(id),
            name: format!("Method {id}"),
            price: Money::from_cents(cents),
            description: String::new(),
            estimated_delivery: None,
            tracking_available: false,
        }
    }

    #[test]
    fn test_deserialize_string_prices() {
        let m: ShippingMethod = serde_json::from_str(
            r#"{"id": 1, "name": "Standard Shipping", "price": "9.99", "estimated_delivery": "5-7 business days"}"#,
        )
        .unwrap();
        assert_eq!(m.price, Money::from_cents(999));
        assert_eq!(m.estimated_delivery.as_deref(), Some("5-7 business days"));

        let m: ShippingMethod =
            serde_json::from_str(r#"{"id": 2, "name": "Pickup", "price": null}"#).unwrap();
        assert!(m.price.is_zero());
    }

    #[test]
    fn test_sort_by_price_is_stable() {
        let mut options = vec![
            ShippingOption::base(method(1, 1500), 2),
            ShippingOption::base(method(2, 500), 2),
            ShippingOption::base(method(3, 500), 2),
        ];
        sort_by_price(&mut options);
        let ids: Vec<i64> = options.iter().map(|o| o.method.id.as_i64()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_quoted_option_reprices_method() {
        let quote = ShippingQuote {
            price: Money::from_cents(1299),
            base_price: Money::from_cents(999),
            has_tiers: true,
        };
        let option = ShippingOption::quoted(method(1, 999), &quote, 5);
        assert_eq!(option.to_method().price, Money::from_cents(1299));
    }
}
