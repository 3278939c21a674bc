//! Non-negative monetary amounts using decimal arithmetic.
//!
//! Every price, shipping cost and discount flowing through the storefront is a
//! [`Money`]. Construction rejects negative amounts, so the totals calculator
//! never has to guard against them. Multiplication and addition saturate at
//! [`Money::MAX`] instead of overflowing.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is below zero.
    #[error("amount cannot be negative (got {0})")]
    Negative(Decimal),
    /// The input could not be parsed as a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// A non-negative amount in the store currency's standard unit.
///
/// The amount is kept at full precision; [`Money::rounded`] rounds to cents
/// for display and for values sent to the backend.
///
/// ```
/// use emporium_core::Money;
/// use rust_decimal::Decimal;
///
/// let price = Money::new(Decimal::new(2999, 2)).unwrap();
/// assert_eq!(price.times(2).to_string(), "59.98");
/// assert!(Money::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest representable amount.
    pub const MAX: Self = Self(Decimal::MAX);

    /// Create a new amount.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create an amount, clamping negative values to zero.
    #[must_use]
    pub fn clamped(amount: Decimal) -> Self {
        Self(amount.max(Decimal::ZERO))
    }

    /// Create an amount from a count of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// Parse an amount from a string such as `"9.99"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a decimal or is negative.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let amount = s
            .trim()
            .parse::<Decimal>()
            .map_err(|_| MoneyError::Invalid(s.to_string()))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The amount rounded half away from zero to two decimal places.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// The amount multiplied by a quantity, saturating at [`Money::MAX`].
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map_or(Self::MAX, Self)
    }

    /// Add, saturating at [`Money::MAX`].
    #[must_use]
    pub fn saturating_add(&self, other: Self) -> Self {
        self.0.checked_add(other.0).map_or(Self::MAX, Self)
    }

    /// Subtract, flooring the result at zero.
    #[must_use]
    pub fn saturating_sub(&self, other: Self) -> Self {
        Self::clamped(self.0 - other.0)
    }

    /// Format with a currency symbol, e.g. `"৳109.97"`.
    #[must_use]
    pub fn display_in(&self, currency: CurrencyCode) -> String {
        format!("{}{self}", currency.symbol())
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{:.2}", self.rounded().0))
    }
}

/// Lenient decoding for amounts coming from loosely-typed sources.
///
/// Accepts numbers, numeric strings and `null`. Anything unparseable decodes
/// to zero and negative amounts clamp to zero, matching how stored carts and
/// shipping listings were historically read.
///
/// ```
/// # use emporium_core::Money;
/// #[derive(serde::Deserialize)]
/// struct Row {
///     #[serde(with = "emporium_core::types::money::lenient")]
///     price: Money,
/// }
///
/// let row: Row = serde_json::from_str(r#"{"price": "n/a"}"#).unwrap();
/// assert!(row.price.is_zero());
/// ```
pub mod lenient {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Money;

    /// Decode a value into a number, tolerating strings and nulls.
    #[must_use]
    pub fn decimal_from_value(value: &serde_json::Value) -> Option<Decimal> {
        match value {
            serde_json::Value::Number(n) => n
                .to_string()
                .parse::<Decimal>()
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain)),
            serde_json::Value::String(s) => s.trim().parse::<Decimal>().ok(),
            _ => None,
        }
    }

    /// Serialize like a regular [`Money`].
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(money, serializer)
    }

    /// Deserialize, falling back to zero for unusable input.
    ///
    /// # Errors
    ///
    /// Only fails if the input is not valid JSON for the deserializer.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(decimal_from_value(&value).map_or(Money::ZERO, Money::clamped))
    }
}

/// ISO 4217 currency codes the storefront can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    BDT,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::BDT => "৳",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// The ISO code, e.g. `"BDT"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BDT => "BDT",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

/// Error returned when parsing an unsupported [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported currency: {0}")]
pub struct UnknownCurrency(pub String);

impl core::str::FromStr for CurrencyCode {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::BDT, Self::USD, Self::EUR, Self::GBP]
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCurrency(s.to_string()))
    }
}
