//! Unified error handling with Sentry integration.
//!
//! Each layer has its own error enum; [`StorefrontError`] unifies them for
//! front ends. [`StorefrontError::report`] logs the error and captures
//! backend and storage failures to Sentry.

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::store::CartStoreError;

/// Top-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Persisted state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartStoreError),

    /// Checkout could not be completed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Invalid input from the front end.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl StorefrontError {
    /// Whether the error should be captured to Sentry.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Api(err) | Self::Checkout(CheckoutError::Api(err)) => err.is_server_side(),
            Self::Storage(_) | Self::Cart(CartStoreError::Storage(_)) => true,
            _ => false,
        }
    }

    /// Log the error, capturing it to Sentry when it is not the customer's
    /// doing.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_error_display() {
        let err = StorefrontError::BadRequest("quantity must be a number".to_string());
        assert_eq!(err.to_string(), "Bad request: quantity must be a number");

        let err = StorefrontError::from(ApiError::NotFound("/api/products/x/".to_string()));
        assert_eq!(
            err.to_string(),
            "API error: Resource not found: /api/products/x/"
        );
    }

    #[test]
    fn test_reportable_errors() {
        assert!(StorefrontError::from(ApiError::Server(500)).is_reportable());
        assert!(!StorefrontError::from(ApiError::Unauthorized).is_reportable());
        assert!(
            StorefrontError::from(StorageError::InvalidKey("x/y".to_string())).is_reportable()
        );
        assert!(!StorefrontError::BadRequest("nope".to_string()).is_reportable());
    }

    #[test]
    fn test_report_without_sentry_client() {
        // No Sentry client is bound in tests; capture is a no-op.
        StorefrontError::from(ApiError::Server(503)).report();
        add_breadcrumb("test", "breadcrumb", Some(&[("key", "value")]));
    }
}
