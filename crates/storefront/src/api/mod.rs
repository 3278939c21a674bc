//! Backend REST API client.
//!
//! # Architecture
//!
//! - JSON over HTTP with `reqwest`; every request carries an `x-request-id`
//! - The backend is the source of truth for catalog, coupons and orders
//! - Catalog reads are cached in memory via `moka` (5 minute TTL by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use emporium_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config)?;
//! let page = client.list_products(&ProductFilter::default()).await?;
//! let product = client.product_by_slug("linen-shirt").await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::{ApiClient, REQUEST_ID_HEADER};
pub use types::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure: connection refused, timeout, TLS.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 401 from the backend.
    #[error("Authentication required. Please login again.")]
    Unauthorized,

    /// 403 from the backend.
    #[error("{0}")]
    Forbidden(String),

    /// 404 for the given endpoint.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 400 with field errors.
    #[error("{message}")]
    Validation {
        message: String,
        errors: serde_json::Value,
    },

    /// 5xx from the backend.
    #[error("Server error ({0}). Please try again later.")]
    Server(u16),

    /// Any other non-success status.
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// HTML error page or a non-JSON success body.
    #[error("Server returned unexpected response format (status {status})")]
    UnexpectedFormat { status: u16 },

    /// JSON body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot carry a path.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Whether the failure is on the backend or network side rather than
    /// something the customer can fix.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Server(_) | Self::UnexpectedFormat { .. } | Self::Parse(_)
        )
    }
}

/// Map a non-success response to an [`ApiError`].
pub(crate) fn error_for_status(
    status: StatusCode,
    content_type: Option<&str>,
    body: &str,
    endpoint: &str,
) -> ApiError {
    let code = status.as_u16();
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized;
    }
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(endpoint.to_string());
    }
    if status.is_server_error() {
        return ApiError::Server(code);
    }
    if content_type.is_some_and(|ct| ct.contains("text/html")) {
        return ApiError::UnexpectedFormat { status: code };
    }

    let data: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let text = |field: &str| data.get(field).and_then(serde_json::Value::as_str).map(String::from);

    if status == StatusCode::BAD_REQUEST
        && let Some(errors) = data.get("errors")
    {
        return ApiError::Validation {
            message: text("message").unwrap_or_else(|| "Validation failed".to_string()),
            errors: errors.clone(),
        };
    }
    if status == StatusCode::FORBIDDEN {
        return ApiError::Forbidden(text("detail").unwrap_or_else(|| {
            "Access denied. You do not have permission to perform this action.".to_string()
        }));
    }

    ApiError::Status {
        status: code,
        message: text("detail")
            .or_else(|| text("message"))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, None, "", "/api/orders/"),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, Some("text/html"), "<html>", "/api/x/"),
            ApiError::NotFound(ref e) if e == "/api/x/"
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, None, "", "/"),
            ApiError::Server(502)
        ));
        assert!(matches!(
            error_for_status(StatusCode::CONFLICT, Some("text/html; charset=utf-8"), "<h1>", "/"),
            ApiError::UnexpectedFormat { status: 409 }
        ));
    }

    #[test]
    fn test_validation_errors_keep_fields() {
        let err = error_for_status(
            StatusCode::BAD_REQUEST,
            Some("application/json"),
            r#"{"message": "Order invalid", "errors": {"items": ["empty"]}}"#,
            "/api/orders/submit/",
        );
        match err {
            ApiError::Validation { message, errors } => {
                assert_eq!(message, "Order invalid");
                assert_eq!(errors["items"][0], "empty");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_forbidden_and_other_statuses() {
        let err = error_for_status(StatusCode::FORBIDDEN, None, "{}", "/");
        assert!(err.to_string().starts_with("Access denied"));

        let err = error_for_status(
            StatusCode::FORBIDDEN,
            None,
            r#"{"detail": "Staff only"}"#,
            "/",
        );
        assert_eq!(err.to_string(), "Staff only");

        let err = error_for_status(StatusCode::BAD_REQUEST, None, r#"{"detail": "Bad quantity"}"#, "/");
        assert_eq!(err.to_string(), "Request failed (400): Bad quantity");
        assert!(!err.is_server_side());
    }

    #[test]
    fn test_server_side_classification() {
        assert!(ApiError::Server(500).is_server_side());
        assert!(!ApiError::Unauthorized.is_server_side());
        assert!(!ApiError::NotFound("/".to_string()).is_server_side());
    }
}
