//! Coupons and local discount rules.
//!
//! Coupon validity is decided by the backend. The rules here only reproduce
//! the display arithmetic: given a coupon the backend already confirmed, how
//! much does it take off this subtotal, and is the minimum purchase met.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::money::lenient;
use crate::types::Money;

// =============================================================================
// Coupon Code
// =============================================================================

/// Errors from parsing a [`CouponCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponCodeError {
    /// The code is empty or only whitespace.
    #[error("Please enter a coupon code")]
    Empty,
}

/// A coupon code, trimmed and upper-cased so comparison is case-insensitive.
///
/// ```
/// use emporium_core::coupon::CouponCode;
///
/// let code = CouponCode::parse("  save10 ").unwrap();
/// assert_eq!(code.as_str(), "SAVE10");
/// assert_eq!(code, CouponCode::parse("SAVE10").unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    /// Normalise user input into a code.
    ///
    /// # Errors
    ///
    /// Returns [`CouponCodeError::Empty`] for blank input.
    pub fn parse(input: &str) -> Result<Self, CouponCodeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CouponCodeError::Empty);
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// The normalised code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self {
        code.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discount {
    /// Percentage of the subtotal, between 0 and 100.
    Percentage(Decimal),
    /// Fixed amount, capped at the subtotal.
    Fixed(Money),
}

impl Discount {
    /// Build a percentage discount.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::PercentageOutOfRange`] unless `0 <= percent <= 100`.
    pub fn percentage(percent: Decimal) -> Result<Self, CouponError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(CouponError::PercentageOutOfRange(percent));
        }
        Ok(Self::Percentage(percent))
    }

    /// Discount this coupon takes off `subtotal`, ignoring eligibility.
    #[must_use]
    pub fn amount_for(&self, subtotal: Money) -> Money {
        match self {
            Self::Percentage(percent) => subtotal
                .amount()
                .checked_mul(*percent / Decimal::ONE_HUNDRED)
                .map_or(subtotal, Money::clamped),
            Self::Fixed(value) => (*value).min(subtotal),
        }
    }

    /// Short label for the discount kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Percentage(_) => "percentage",
            Self::Fixed(_) => "fixed",
        }
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percentage(percent) => write!(f, "{}% off", percent.normalize()),
            Self::Fixed(value) => write!(f, "{value} off"),
        }
    }
}

/// Errors from constructing a [`Coupon`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    /// Percentage discount outside `0..=100`.
    #[error("percentage discount must be between 0 and 100 (got {0})")]
    PercentageOutOfRange(Decimal),
    /// Unknown discount type string.
    #[error("unknown discount type: {0}")]
    UnknownDiscountType(String),
    /// Invalid code.
    #[error(transparent)]
    Code(#[from] CouponCodeError),
}

// =============================================================================
// Coupon
// =============================================================================

/// Why a coupon does not apply to a cart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    /// The subtotal is below the coupon's minimum purchase.
    #[error("Minimum purchase of {required} not met (subtotal {subtotal})")]
    MinimumNotMet {
        /// Required minimum subtotal.
        required: Money,
        /// The cart's subtotal.
        subtotal: Money,
    },
}

/// A coupon as described by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CouponRecord")]
pub struct Coupon {
    pub code: CouponCode,
    pub discount: Discount,
    /// Minimum subtotal for the coupon to apply.
    pub min_purchase: Money,
    /// Whether the coupon also waives shipping.
    pub free_shipping: bool,
}

impl Coupon {
    /// Create a coupon with no minimum purchase and no free shipping.
    #[must_use]
    pub const fn new(code: CouponCode, discount: Discount) -> Self {
        Self {
            code,
            discount,
            min_purchase: Money::ZERO,
            free_shipping: false,
        }
    }

    /// Set the minimum purchase.
    #[must_use]
    pub const fn with_min_purchase(mut self, min_purchase: Money) -> Self {
        self.min_purchase = min_purchase;
        self
    }

    /// Set whether the coupon waives shipping.
    #[must_use]
    pub const fn with_free_shipping(mut self, free_shipping: bool) -> Self {
        self.free_shipping = free_shipping;
        self
    }

    /// Whether `subtotal` meets the minimum purchase.
    #[must_use]
    pub fn qualifies(&self, subtotal: Money) -> bool {
        subtotal >= self.min_purchase
    }

    /// Discount for `subtotal`.
    ///
    /// # Errors
    ///
    /// Returns [`CouponRejection::MinimumNotMet`] if the subtotal is below the
    /// minimum purchase.
    pub fn evaluate(&self, subtotal: Money) -> Result<Money, CouponRejection> {
        if !self.qualifies(subtotal) {
            return Err(CouponRejection::MinimumNotMet {
                required: self.min_purchase,
                subtotal,
            });
        }
        Ok(self.discount.amount_for(subtotal))
    }
}

/// Wire shape of a coupon listing entry.
#[derive(Debug, Clone, Deserialize)]
struct CouponRecord {
    code: String,
    #[serde(default = "default_discount_type")]
    discount_type: String,
    #[serde(default, with = "lenient")]
    discount_value: Money,
    #[serde(default, alias = "min_purchase", alias = "minPurchase", with = "lenient")]
    minimum_amount: Money,
    #[serde(default, alias = "is_free_shipping", alias = "isFreeShipping")]
    free_shipping: bool,
}

fn default_discount_type() -> String {
    "percentage".to_string()
}

impl TryFrom<CouponRecord> for Coupon {
    type Error = CouponError;

    fn try_from(record: CouponRecord) -> Result<Self, Self::Error> {
        let discount = match record.discount_type.to_ascii_lowercase().as_str() {
            "percentage" | "percent" => Discount::percentage(record.discount_value.amount())?,
            "fixed" | "amount" => Discount::Fixed(record.discount_value),
            other => return Err(CouponError::UnknownDiscountType(other.to_string())),
        };
        Ok(Self {
            code: CouponCode::parse(&record.code)?,
            discount,
            min_purchase: record.minimum_amount,
            free_shipping: record.free_shipping,
        })
    }
}

// =============================================================================
// Coupon Outcome
// =============================================================================

/// A coupon the backend confirmed for a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub code: CouponCode,
    /// Discount amount as computed by the backend.
    pub discount: Money,
    pub message: String,
    /// Backend label for the discount kind (e.g. `percentage`).
    pub kind: String,
    /// Full coupon terms, when the backend returned them.
    pub terms: Option<Coupon>,
}

impl AppliedCoupon {
    /// The coupon used for display totals.
    ///
    /// With terms, the discount follows the cart as it changes. Without
    /// them, the backend-confirmed amount is applied as a fixed discount.
    #[must_use]
    pub fn as_coupon(&self) -> Coupon {
        self.terms.as_ref().map_or_else(
            || Coupon::new(self.code.clone(), Discount::Fixed(self.discount)),
            |terms| Coupon {
                code: self.code.clone(),
                ..terms.clone()
            },
        )
    }
}

/// Result of trying to apply a coupon. Rejections are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponOutcome {
    /// The backend accepted the coupon.
    Applied(AppliedCoupon),
    /// The coupon was not applied; `message` is shown to the customer.
    Rejected {
        /// Customer-facing reason.
        message: String,
    },
}

impl CouponOutcome {
    /// Build a rejection.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Whether the coupon was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Customer-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Applied(applied) => &applied.message,
            Self::Rejected { message } => message,
        }
    }
}
