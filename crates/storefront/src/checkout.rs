//! Checkout session: shipping choice, coupon, totals and order submission.
//!
//! # Flow
//!
//! 1. Pick a shipping method ([`CheckoutSession::select_shipping`])
//! 2. Optionally apply a coupon ([`CheckoutSession::apply_coupon`])
//! 3. Review [`CheckoutSession::totals`]
//! 4. [`CheckoutSession::submit`] validates the form, posts the order and
//!    clears the submitted lines from the cart
//!
//! Totals shown here are for display. The backend recomputes the amount
//! charged from the submitted items.

use emporium_core::cart::LineItemKey;
use emporium_core::checkout::{CustomerDetails, OrderDraft, PaymentDetails, ValidationErrors};
use emporium_core::coupon::{AppliedCoupon, CouponOutcome, CouponRejection};
use emporium_core::order::OrderConfirmation;
use emporium_core::shipping::{ShippingMethod, ShippingOption};
use emporium_core::totals::{TotalsBreakdown, compute_totals};
use emporium_core::{ShippingMethodId, UserId};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::api::{ApiClient, ApiError};
use crate::coupons::CouponService;
use crate::error::add_breadcrumb;
use crate::shipping::ShippingService;
use crate::store::CartStore;

/// Errors that stop a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The form is incomplete; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The applied coupon no longer fits the cart. It has been removed;
    /// submitting again places the order without it.
    #[error("Coupon removed: {0}")]
    CouponRejected(CouponRejection),

    /// The chosen shipping method is not offered.
    #[error("Shipping method {0} is not available")]
    UnknownShippingMethod(ShippingMethodId),

    /// The backend refused the order or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// State of one checkout.
pub struct CheckoutSession {
    cart: CartStore,
    api: ApiClient,
    coupons: CouponService,
    shipping: Option<ShippingMethod>,
    coupon: Option<AppliedCoupon>,
    customer: CustomerDetails,
}

impl CheckoutSession {
    /// Start a checkout for the given cart.
    #[must_use]
    pub fn new(api: ApiClient, cart: CartStore) -> Self {
        Self {
            coupons: CouponService::new(api.clone()),
            api,
            cart,
            shipping: None,
            coupon: None,
            customer: CustomerDetails::default(),
        }
    }

    /// Check out as a signed-in customer.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.coupons = self.coupons.with_user(user_id);
        self
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    // =========================================================================
    // Shipping
    // =========================================================================

    /// Use this shipping method at its listed price.
    pub fn select_shipping(&mut self, method: ShippingMethod) {
        info!(method = %method.name, price = %method.price, "Shipping selected");
        self.shipping = Some(method);
    }

    /// Use a quoted option, carrying its quantity-tiered price.
    pub fn select_option(&mut self, option: &ShippingOption) {
        self.select_shipping(option.to_method());
    }

    /// Quote every method for the cart and select `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::UnknownShippingMethod`] if `id` is not
    /// offered, or [`CheckoutError::Api`] if methods cannot be listed.
    pub async fn select_shipping_by_id(
        &mut self,
        id: ShippingMethodId,
    ) -> Result<ShippingOption, CheckoutError> {
        let quantity = self.cart.item_count();
        let option = ShippingService::new(self.api.clone())
            .calculate_options(quantity)
            .await?
            .into_iter()
            .find(|o| o.method.id == id)
            .ok_or(CheckoutError::UnknownShippingMethod(id))?;
        self.select_option(&option);
        Ok(option)
    }

    #[must_use]
    pub const fn shipping(&self) -> Option<&ShippingMethod> {
        self.shipping.as_ref()
    }

    pub fn clear_shipping(&mut self) {
        self.shipping = None;
    }

    // =========================================================================
    // Coupon
    // =========================================================================

    /// Ask the backend to apply `code` to the current cart.
    ///
    /// An applied coupon replaces any previous one. A rejection leaves the
    /// previous coupon in place.
    pub async fn apply_coupon(&mut self, code: &str) -> CouponOutcome {
        let cart = self.cart.cart();
        let outcome = self
            .coupons
            .apply_coupon(code, cart.items(), cart.subtotal())
            .await;
        if let CouponOutcome::Applied(applied) = &outcome {
            self.coupon = Some(applied.clone());
        }
        outcome
    }

    #[must_use]
    pub const fn applied_coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    /// Drop the applied coupon, returning it.
    pub fn remove_coupon(&mut self) -> Option<AppliedCoupon> {
        self.coupon.take()
    }

    // =========================================================================
    // Customer
    // =========================================================================

    pub fn set_customer(&mut self, customer: CustomerDetails) {
        self.customer = customer;
    }

    #[must_use]
    pub const fn customer(&self) -> &CustomerDetails {
        &self.customer
    }

    // =========================================================================
    // Totals and Submission
    // =========================================================================

    /// Recompute totals from the current cart.
    ///
    /// If the applied coupon no longer qualifies (the cart shrank below its
    /// minimum), it is removed and the breakdown reports the rejection.
    pub fn totals(&mut self) -> TotalsBreakdown {
        let cart = self.cart.cart();
        let coupon = self.coupon.as_ref().map(AppliedCoupon::as_coupon);
        let breakdown = compute_totals(cart.items(), self.shipping.as_ref(), coupon.as_ref());

        if let Some(rejection) = breakdown.rejection()
            && let Some(removed) = self.coupon.take()
        {
            warn!(code = %removed.code, reason = %rejection, "Coupon no longer applies, removed");
        }
        breakdown
    }

    /// The rejection reason the last [`CheckoutSession::totals`] call would
    /// report, without mutating the session.
    #[must_use]
    pub fn coupon_rejection(&self) -> Option<CouponRejection> {
        let cart = self.cart.cart();
        let coupon = self.coupon.as_ref()?.as_coupon();
        coupon.evaluate(cart.subtotal()).err()
    }

    /// Validate and submit the order.
    ///
    /// Validation failures, and a coupon the cart no longer qualifies for,
    /// return before any network call. On success the
    /// submitted lines are removed from the cart and the coupon and shipping
    /// selection are reset. On failure the cart is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] listing every problem with the
    /// form, [`CheckoutError::CouponRejected`] if the applied coupon was
    /// dropped, or [`CheckoutError::Api`] if the backend refused the order.
    #[instrument(skip_all, fields(items = self.cart.cart().len()))]
    pub async fn submit(
        &mut self,
        payment: &PaymentDetails,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let breakdown = self.totals();
        if let Some(rejection) = breakdown.rejection() {
            return Err(CheckoutError::CouponRejected(rejection.clone()));
        }
        let cart = self.cart.cart();
        let code = self.coupon.as_ref().map(|c| c.code.clone());

        let payload = OrderDraft {
            items: cart.items(),
            shipping: self.shipping.as_ref(),
            coupon: code.as_ref(),
            customer: &self.customer,
            payment,
            totals: &breakdown.totals,
        }
        .into_payload()
        .inspect_err(|e| info!(problems = e.errors().len(), "Checkout form incomplete"))?;

        let confirmation = self.api.submit_order(&payload).await?;

        for warning in &confirmation.warnings {
            warn!(order = %confirmation.order_number, warning = %warning, "Backend warning");
        }
        add_breadcrumb(
            "checkout",
            "Order submitted",
            Some(&[("order_number", &confirmation.order_number)]),
        );
        info!(
            order = %confirmation.order_number,
            total = %confirmation.total_amount,
            "Order placed"
        );

        let submitted: Vec<LineItemKey> = cart.items().iter().map(|i| i.key.clone()).collect();
        if let Err(e) = self.cart.remove_checked_out(&submitted) {
            error!(error = %e, "Order placed but the cart could not be cleared");
        }
        self.coupon = None;
        self.shipping = None;

        Ok(confirmation)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use emporium_core::cart::CartLineItem;
    use emporium_core::checkout::Field;
    use emporium_core::coupon::{Coupon, CouponCode, Discount};
    use emporium_core::{Money, ProductId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::storage::MemoryStore;

    fn session() -> CheckoutSession {
        let config = StorefrontConfig::for_api("http://127.0.0.1:9").unwrap();
        let cart = CartStore::open(Arc::new(MemoryStore::new()));
        CheckoutSession::new(ApiClient::new(&config).unwrap(), cart)
    }

    fn applied(code: &str, discount_cents: u32) -> AppliedCoupon {
        AppliedCoupon {
            code: CouponCode::parse(code).unwrap(),
            discount: Money::from_cents(discount_cents),
            message: String::new(),
            kind: "fixed".to_string(),
            terms: None,
        }
    }

    #[test]
    fn test_totals_use_backend_discount() {
        let mut session = session();
        session
            .cart()
            .add(CartLineItem::new(
                ProductId::new(1),
                "Tee",
                Money::from_cents(2999),
                2,
                None,
                None,
            ))
            .unwrap();
        session.coupon = Some(applied("SAVE10", 600));

        let breakdown = session.totals();
        assert_eq!(breakdown.totals.discount_amount, Money::from_cents(600));
        assert_eq!(breakdown.totals.total, Money::from_cents(5398));
        assert!(session.applied_coupon().is_some());
    }

    #[tokio::test]
    async fn test_submit_refuses_dropped_coupon() {
        let mut session = session();
        session
            .cart()
            .add(CartLineItem::new(
                ProductId::new(1),
                "Tee",
                Money::from_cents(2999),
                1,
                None,
                None,
            ))
            .unwrap();
        session.coupon = Some(AppliedCoupon {
            terms: Some(
                Coupon::new(
                    CouponCode::parse("SAVE10").unwrap(),
                    Discount::percentage(Decimal::TEN).unwrap(),
                )
                .with_min_purchase(Money::from_cents(5000)),
            ),
            ..applied("SAVE10", 600)
        });

        // Nothing listens on port 9, so reaching the network would be an
        // Api error rather than a coupon rejection.
        let err = session.submit(&PaymentDetails::default()).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::CouponRejected(CouponRejection::MinimumNotMet { .. })
        ));
        assert!(session.applied_coupon().is_none());
        assert_eq!(session.cart().item_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_validates_before_network() {
        let mut session = session();
        let err = session.submit(&PaymentDetails::default()).await.unwrap_err();
        match err {
            CheckoutError::Validation(errors) => {
                assert!(errors.has(Field::Cart));
                assert!(errors.has(Field::ShippingMethod));
                assert!(errors.has(Field::TransactionId));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
