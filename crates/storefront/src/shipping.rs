//! Shipping options priced for the current cart.

use emporium_core::shipping::{ShippingOption, sort_by_price};
use tracing::{instrument, warn};

use crate::api::{ApiClient, ApiError};

/// Quotes shipping methods for a cart quantity.
#[derive(Clone)]
pub struct ShippingService {
    api: ApiClient,
}

impl ShippingService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Every shipping method priced for `quantity` items, cheapest first.
    ///
    /// A method whose tiered quote fails falls back to its base price.
    ///
    /// # Errors
    ///
    /// Returns an error if the shipping methods cannot be listed.
    #[instrument(skip(self))]
    pub async fn calculate_options(&self, quantity: u32) -> Result<Vec<ShippingOption>, ApiError> {
        let methods = self.api.shipping_methods().await?;
        let mut options = Vec::with_capacity(methods.len());

        for method in methods {
            match self.api.shipping_quote(method.id, quantity).await {
                Ok(quote) => options.push(ShippingOption::quoted(method, &quote, quantity)),
                Err(e) => {
                    warn!(
                        method = %method.name,
                        error = %e,
                        "Shipping quote failed, using base price"
                    );
                    options.push(ShippingOption::base(method, quantity));
                }
            }
        }

        sort_by_price(&mut options);
        Ok(options)
    }

    /// The cheapest option for `quantity` items, if any method exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the shipping methods cannot be listed.
    pub async fn best_option(&self, quantity: u32) -> Result<Option<ShippingOption>, ApiError> {
        Ok(self.calculate_options(quantity).await?.into_iter().next())
    }
}
