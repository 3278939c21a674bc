//! Checkout form validation and the order submission payload.
//!
//! Validation runs before any network call and reports every problem at
//! once, so the customer can fix the whole form in one pass.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::cart::CartLineItem;
use crate::coupon::CouponCode;
use crate::shipping::ShippingMethod;
use crate::totals::OrderTotals;
use crate::types::{ColorId, Email, Money, PaymentMethod, ProductId, ShippingMethodId, SizeId};

/// Minimum length of the sender number and the transaction id.
pub const MIN_PAYMENT_REFERENCE_LENGTH: usize = 5;

/// Country used when the customer leaves it blank.
pub const DEFAULT_COUNTRY: &str = "Bangladesh";

// =============================================================================
// Form Input
// =============================================================================

/// Customer and shipping address details as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub country: Option<String>,
}

/// Mobile payment details as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Number the customer sent money from.
    pub sender_number: String,
    pub transaction_id: String,
    pub payment_method: Option<PaymentMethod>,
    /// Merchant account the money was sent to.
    #[serde(default)]
    pub admin_account_number: Option<String>,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A checkout form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Cart,
    ShippingMethod,
    FirstName,
    LastName,
    Email,
    Phone,
    StreetAddress,
    City,
    State,
    ZipCode,
    SenderNumber,
    TransactionId,
    PaymentMethod,
}

impl Field {
    /// Human-readable field label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cart => "Cart",
            Self::ShippingMethod => "Shipping Method",
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Email => "Email Address",
            Self::Phone => "Phone Number",
            Self::StreetAddress => "Street Address",
            Self::City => "City",
            Self::State => "State",
            Self::ZipCode => "ZIP Code",
            Self::SenderNumber => "Sender Number",
            Self::TransactionId => "Transaction ID",
            Self::PaymentMethod => "Payment Method",
        }
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Every failed check for a checkout attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn require(&mut self, field: Field, value: &str) -> bool {
        if value.trim().is_empty() {
            self.push(field, format!("{} is required", field.label()));
            return false;
        }
        true
    }

    /// The failed checks, in form order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether `field` failed.
    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "checkout form is incomplete: {}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

// =============================================================================
// Validation
// =============================================================================

fn is_phone_like(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '))
}

fn check_customer(errors: &mut ValidationErrors, customer: &CustomerDetails) {
    errors.require(Field::FirstName, &customer.first_name);
    errors.require(Field::LastName, &customer.last_name);
    if errors.require(Field::Email, &customer.email) {
        if let Err(e) = Email::parse(&customer.email) {
            errors.push(Field::Email, format!("Please enter a valid email address ({e})"));
        }
    }
    errors.require(Field::Phone, &customer.phone);
    errors.require(Field::StreetAddress, &customer.street_address);
    errors.require(Field::City, &customer.city);
    errors.require(Field::State, &customer.state);
    errors.require(Field::ZipCode, &customer.zip_code);
}

fn check_reference(errors: &mut ValidationErrors, field: Field, value: &str) {
    if !errors.require(field, value) {
        return;
    }
    if value.trim().chars().count() < MIN_PAYMENT_REFERENCE_LENGTH {
        errors.push(
            field,
            format!(
                "{} must be at least {MIN_PAYMENT_REFERENCE_LENGTH} characters long",
                field.label()
            ),
        );
    }
}

fn check_payment(errors: &mut ValidationErrors, payment: &PaymentDetails) {
    check_reference(errors, Field::SenderNumber, &payment.sender_number);
    if !payment.sender_number.trim().is_empty() && !is_phone_like(payment.sender_number.trim()) {
        errors.push(Field::SenderNumber, "Please enter a valid phone number");
    }
    check_reference(errors, Field::TransactionId, &payment.transaction_id);
    if payment.payment_method.is_none() {
        errors.push(Field::PaymentMethod, "Payment Method is required");
    }
}

/// Validate customer details alone, e.g. before showing payment options.
///
/// # Errors
///
/// Returns every missing or malformed field.
pub fn validate_customer(customer: &CustomerDetails) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_customer(&mut errors, customer);
    errors.into_result()
}

// =============================================================================
// Order Payload
// =============================================================================

/// Shipping address sent with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingAddress {
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// One ordered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItemPayload {
    pub product: ProductId,
    pub color: Option<ColorId>,
    pub size: Option<SizeId>,
    pub quantity: u32,
    pub unit_price: Money,
}

impl From<&CartLineItem> for OrderItemPayload {
    fn from(item: &CartLineItem) -> Self {
        Self {
            product: item.product_id,
            color: item.color.as_ref().map(|c| c.id),
            size: item.size.as_ref().map(|s| s.id),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// Payment block of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentPayload {
    pub sender_number: String,
    pub transaction_id: String,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_account_number: Option<String>,
}

/// Body of the order submission request.
///
/// `frontend_subtotal` and `frontend_total` are for the backend's
/// consistency check only; the backend computes the amount charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPayload {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: ShippingAddress,
    pub shipping_method: ShippingMethodId,
    pub items: Vec<OrderItemPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<CouponCode>,
    pub payment: PaymentPayload,
    pub frontend_subtotal: Money,
    pub frontend_total: Money,
}

/// Everything needed to place an order.
#[derive(Debug, Clone, Copy)]
pub struct OrderDraft<'a> {
    pub items: &'a [CartLineItem],
    pub shipping: Option<&'a ShippingMethod>,
    pub coupon: Option<&'a CouponCode>,
    pub customer: &'a CustomerDetails,
    pub payment: &'a PaymentDetails,
    pub totals: &'a OrderTotals,
}

impl OrderDraft<'_> {
    /// Validate the draft and build the request body.
    ///
    /// # Errors
    ///
    /// Returns every failed check; nothing is built unless all pass.
    pub fn into_payload(self) -> Result<OrderPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.items.is_empty() {
            errors.push(Field::Cart, "Your cart is empty");
        }
        if self.shipping.is_none() {
            errors.push(Field::ShippingMethod, "Please select a shipping method");
        }
        check_customer(&mut errors, self.customer);
        check_payment(&mut errors, self.payment);
        errors.into_result()?;

        let (Some(shipping), Some(payment_method)) = (self.shipping, self.payment.payment_method)
        else {
            return Err(ValidationErrors::default());
        };

        let customer = self.customer;
        let country = customer
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COUNTRY);

        Ok(OrderPayload {
            customer_name: format!(
                "{} {}",
                customer.first_name.trim(),
                customer.last_name.trim()
            ),
            customer_email: customer.email.trim().to_string(),
            customer_phone: customer.phone.trim().to_string(),
            shipping_address: ShippingAddress {
                street_address: customer.street_address.trim().to_string(),
                city: customer.city.trim().to_string(),
                state: customer.state.trim().to_string(),
                zip_code: customer.zip_code.trim().to_string(),
                country: country.to_string(),
            },
            shipping_method: shipping.id,
            items: self.items.iter().map(OrderItemPayload::from).collect(),
            coupon_code: self.coupon.cloned(),
            payment: PaymentPayload {
                sender_number: self.payment.sender_number.trim().to_string(),
                transaction_id: self.payment.transaction_id.trim().to_string(),
                payment_method,
                admin_account_number: self
                    .payment
                    .admin_account_number
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(ToString::to_string),
            },
            frontend_subtotal: self.totals.subtotal.rounded(),
            frontend_total: self.totals.total.rounded(),
        })
    }
}
