//! Request and response bodies that only exist on the wire.

use emporium_core::cart::CartLineItem;
use emporium_core::coupon::{Coupon, CouponCode};
use emporium_core::types::money::lenient;
use emporium_core::{Money, ProductId, UserId};
use serde::{Deserialize, Deserializer, Serialize};

/// A cart line as the coupon validator expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponCartItem {
    pub quantity: u32,
    pub product: ProductId,
}

/// Body of `POST /api/coupons/validate/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponValidationRequest {
    pub coupon_code: CouponCode,
    pub cart_items: Vec<CouponCartItem>,
    pub cart_total: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl CouponValidationRequest {
    /// Build a validation request for the given cart.
    #[must_use]
    pub fn new(
        coupon_code: CouponCode,
        items: &[CartLineItem],
        cart_total: Money,
        user_id: Option<UserId>,
    ) -> Self {
        Self {
            coupon_code,
            cart_items: items
                .iter()
                .map(|item| CouponCartItem {
                    quantity: item.quantity,
                    product: item.product_id,
                })
                .collect(),
            cart_total: cart_total.rounded(),
            user_id,
        }
    }
}

/// Response of `POST /api/coupons/validate/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CouponValidationResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Discount computed by the backend for this cart.
    #[serde(default, with = "lenient")]
    pub discount_amount: Money,
    #[serde(default)]
    pub discount_type: Option<String>,
    /// Coupon terms, when the backend includes them.
    #[serde(default, deserialize_with = "coupon_terms")]
    pub coupon: Option<Coupon>,
}

/// Terms the client cannot interpret are dropped rather than failing the
/// whole response; the discount amount is what matters.
fn coupon_terms<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Coupon>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
