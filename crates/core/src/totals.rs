//! Order total calculator.
//!
//! Totals are always derived from the current cart, shipping selection and
//! coupon; nothing here is stored. Arithmetic is exact and rounding to cents
//! happens only when amounts are displayed.

use serde::Serialize;

use crate::cart::CartLineItem;
use crate::coupon::{Coupon, CouponRejection};
use crate::shipping::ShippingMethod;
use crate::types::Money;

/// Derived totals for a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub discount_amount: Money,
    pub total: Money,
}

/// How the coupon fared against the cart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CouponStatus {
    /// No coupon was supplied.
    #[default]
    None,
    /// The coupon applied.
    Applied,
    /// The coupon does not apply to this cart and should be cleared.
    Rejected(CouponRejection),
}

/// Totals plus the coupon verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsBreakdown {
    pub totals: OrderTotals,
    pub coupon: CouponStatus,
}

impl TotalsBreakdown {
    /// The rejection, if the coupon did not apply.
    #[must_use]
    pub const fn rejection(&self) -> Option<&CouponRejection> {
        match &self.coupon {
            CouponStatus::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Sum of `unit_price × quantity` over the line items.
#[must_use]
pub fn subtotal(items: &[CartLineItem]) -> Money {
    items.iter().map(CartLineItem::line_total).sum()
}

/// Compute order totals.
///
/// A coupon whose minimum purchase is not met contributes no discount, does
/// not waive shipping, and is reported as [`CouponStatus::Rejected`].
///
/// ```
/// use emporium_core::totals::compute_totals;
///
/// let breakdown = compute_totals(&[], None, None);
/// assert!(breakdown.totals.total.is_zero());
/// ```
#[must_use]
pub fn compute_totals(
    items: &[CartLineItem],
    shipping: Option<&ShippingMethod>,
    coupon: Option<&Coupon>,
) -> TotalsBreakdown {
    let subtotal = subtotal(items);
    let mut shipping_cost = shipping.map_or(Money::ZERO, |m| m.price);
    let mut discount_amount = Money::ZERO;

    let status = match coupon {
        None => CouponStatus::None,
        Some(coupon) => match coupon.evaluate(subtotal) {
            Ok(discount) => {
                discount_amount = discount;
                if coupon.free_shipping {
                    shipping_cost = Money::ZERO;
                }
                CouponStatus::Applied
            }
            Err(rejection) => CouponStatus::Rejected(rejection),
        },
    };

    let total = (subtotal + shipping_cost).saturating_sub(discount_amount);

    TotalsBreakdown {
        totals: OrderTotals {
            subtotal,
            shipping_cost,
            discount_amount,
            total,
        },
        coupon: status,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::coupon::{CouponCode, Discount};
    use crate::types::{ProductId, ShippingMethodId};

    fn cart() -> Vec<CartLineItem> {
        vec![
            CartLineItem::new(ProductId::new(1), "Tee", Money::from_cents(2999), 2, None, None),
            CartLineItem::new(ProductId::new(2), "Hoodie", Money::from_cents(4999), 1, None, None),
        ]
    }

    fn standard() -> ShippingMethod {
        ShippingMethod {
            id: ShippingMethodId::new(1),
            name: "Standard".to_string(),
            price: Money::from_cents(999),
            description: String::new(),
            estimated_delivery: None,
            tracking_available: false,
        }
    }

    fn ten_percent(min_cents: u32) -> Coupon {
        Coupon::new(
            CouponCode::parse("SAVE10").unwrap(),
            Discount::percentage(Decimal::TEN).unwrap(),
        )
        .with_min_purchase(Money::from_cents(min_cents))
    }

    #[test]
    fn test_percentage_coupon_applies() {
        let breakdown = compute_totals(&cart(), Some(&standard()), Some(&ten_percent(5000)));
        let t = breakdown.totals;
        assert_eq!(t.subtotal, Money::from_cents(10997));
        assert_eq!(t.shipping_cost, Money::from_cents(999));
        assert_eq!(t.discount_amount.amount(), Decimal::new(10997, 3));
        assert_eq!(t.total.amount(), Decimal::new(108_963, 3));
        assert_eq!(t.total.to_string(), "108.96");
        assert_eq!(breakdown.coupon, CouponStatus::Applied);
    }

    #[test]
    fn test_coupon_below_minimum_is_rejected() {
        let breakdown = compute_totals(&cart(), Some(&standard()), Some(&ten_percent(20000)));
        assert!(breakdown.totals.discount_amount.is_zero());
        assert_eq!(breakdown.totals.total, Money::from_cents(11996));
        assert!(matches!(
            breakdown.rejection(),
            Some(CouponRejection::MinimumNotMet { .. })
        ));
    }

    #[test]
    fn test_no_shipping_no_coupon() {
        let breakdown = compute_totals(&cart(), None, None);
        assert_eq!(breakdown.totals.total, Money::from_cents(10997));
        assert_eq!(breakdown.coupon, CouponStatus::None);
    }

    #[test]
    fn test_free_shipping_only_when_qualified() {
        let coupon = Coupon::new(
            CouponCode::parse("SHIPFREE").unwrap(),
            Discount::Fixed(Money::ZERO),
        )
        .with_free_shipping(true);
        let breakdown = compute_totals(&cart(), Some(&standard()), Some(&coupon));
        assert!(breakdown.totals.shipping_cost.is_zero());
        assert_eq!(breakdown.totals.total, Money::from_cents(10997));

        let coupon = coupon.with_min_purchase(Money::from_cents(50000));
        let breakdown = compute_totals(&cart(), Some(&standard()), Some(&coupon));
        assert_eq!(breakdown.totals.shipping_cost, Money::from_cents(999));
    }

    #[test]
    fn test_total_never_negative() {
        let coupon = Coupon::new(
            CouponCode::parse("ALL").unwrap(),
            Discount::percentage(Decimal::ONE_HUNDRED).unwrap(),
        );
        let breakdown = compute_totals(&cart(), None, Some(&coupon));
        assert!(breakdown.totals.total.is_zero());
    }

    #[test]
    fn test_empty_cart() {
        let breakdown = compute_totals(&[], Some(&standard()), None);
        assert!(breakdown.totals.subtotal.is_zero());
        assert_eq!(breakdown.totals.total, Money::from_cents(999));
    }
}
