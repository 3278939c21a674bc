//! Coupon application against the backend.
//!
//! The backend decides whether a coupon is valid for a cart and how much it
//! takes off. This service turns its answers, and its failures, into a
//! [`CouponOutcome`] the front end can show directly. Rejections are values;
//! nothing here retries.

use emporium_core::cart::CartLineItem;
use emporium_core::coupon::{AppliedCoupon, Coupon, CouponCode, CouponOutcome};
use emporium_core::{Money, UserId};
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, ApiError, CouponValidationRequest};
use crate::error::{StorefrontError, add_breadcrumb};

/// Shown when the code is unknown or inactive.
pub const NOT_FOUND_MESSAGE: &str = "Coupon not found or inactive.";

/// Shown when the backend could not be reached or failed.
pub const UNAVAILABLE_MESSAGE: &str = "Unable to validate coupon. Please try again.";

/// Shown when the backend rejects a code without a reason.
pub const INVALID_MESSAGE: &str = "Invalid coupon code";

/// Validates coupons for a cart.
#[derive(Clone)]
pub struct CouponService {
    api: ApiClient,
    user_id: Option<UserId>,
}

impl CouponService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api, user_id: None }
    }

    /// Validate on behalf of a signed-in customer, for user-specific coupons.
    #[must_use]
    pub const fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Try to apply `code` to a cart.
    ///
    /// A blank code is rejected without contacting the backend. On success
    /// the discount is the amount the backend computed.
    #[instrument(skip(self, items), fields(items = items.len(), subtotal = %subtotal))]
    pub async fn apply_coupon(
        &self,
        code: &str,
        items: &[CartLineItem],
        subtotal: Money,
    ) -> CouponOutcome {
        let code = match CouponCode::parse(code) {
            Ok(code) => code,
            Err(e) => return CouponOutcome::rejected(e.to_string()),
        };

        let request = CouponValidationRequest::new(code.clone(), items, subtotal, self.user_id);
        let response = match self.api.validate_coupon(&request).await {
            Ok(response) => response,
            Err(ApiError::NotFound(_)) => {
                info!(code = %code, "Coupon not found");
                return CouponOutcome::rejected(NOT_FOUND_MESSAGE);
            }
            Err(e) => {
                StorefrontError::from(e).report();
                return CouponOutcome::rejected(UNAVAILABLE_MESSAGE);
            }
        };

        if !response.valid {
            info!(code = %code, "Coupon rejected by backend");
            return CouponOutcome::rejected(
                response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| INVALID_MESSAGE.to_string()),
            );
        }

        let discount = response.discount_amount;
        add_breadcrumb(
            "checkout",
            "Coupon applied",
            Some(&[("code", code.as_str()), ("discount", &discount.to_string())]),
        );
        info!(code = %code, discount = %discount, "Coupon applied");

        CouponOutcome::Applied(AppliedCoupon {
            message: response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("{code} applied successfully!")),
            kind: response
                .discount_type
                .unwrap_or_else(|| "unknown".to_string()),
            terms: response.coupon,
            code,
            discount,
        })
    }

    /// Coupons currently on offer.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn list_active_coupons(&self) -> Result<Vec<Coupon>, ApiError> {
        self.api.coupons().await.inspect_err(|e| {
            warn!(error = %e, "Failed to list coupons");
        })
    }
}
