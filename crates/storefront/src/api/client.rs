//! HTTP client for the storefront backend.
//!
//! Uses `reqwest` with a per-request timeout and tags every request with an
//! `x-request-id`. Products, categories and shipping methods are cached
//! using `moka`.

use std::sync::Arc;

use emporium_core::ShippingMethodId;
use emporium_core::catalog::{Category, Listing, Page, Product, ProductFilter};
use emporium_core::checkout::OrderPayload;
use emporium_core::coupon::Coupon;
use emporium_core::order::{Order, OrderConfirmation, PaymentAccount};
use emporium_core::shipping::{ShippingMethod, ShippingQuote};
use moka::future::Cache;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Span, debug, error, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::cache::{CacheKey, CacheValue};
use super::types::{CouponValidationRequest, CouponValidationResponse};
use super::{ApiError, error_for_status};
use crate::config::StorefrontConfig;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Maximum number of cached catalog entries.
const CACHE_CAPACITY: u64 = 1000;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront backend.
///
/// Cheap to clone; clones share the connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    access_token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                access_token: config.access_token.clone(),
                cache,
            }),
        })
    }

    /// Build `{base}/{segments...}/`. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    /// Send a request and decode the JSON response.
    ///
    /// A 204 response decodes from `null`, so callers expecting no content
    /// should ask for `()` or an `Option`.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let mut request = request
            .header(REQUEST_ID_HEADER, &request_id)
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.inner.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.inspect_err(|e| {
            error!(error = %e, endpoint = url.path(), "Backend request failed");
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;
        debug!(status = %status, endpoint = url.path(), "Backend responded");

        if !status.is_success() {
            let err = error_for_status(status, content_type.as_deref(), &body, url.path());
            if err.is_server_side() {
                error!(
                    status = %status,
                    body = %body.chars().take(200).collect::<String>(),
                    "Backend returned an error"
                );
            } else {
                debug!(status = %status, error = %err, "Backend rejected request");
            }
            return Err(err);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(serde_json::from_str("null")?);
        }

        if !content_type.as_deref().is_some_and(|ct| ct.contains("json")) {
            error!(
                content_type = ?content_type,
                body = %body.chars().take(200).collect::<String>(),
                "Backend returned a non-JSON response"
            );
            return Err(ApiError::UnexpectedFormat {
                status: status.as_u16(),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let request = self.inner.client.get(url.clone());
        self.execute(request, &url).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.inner.client.post(url.clone()).json(body);
        self.execute(request, &url).await
    }

    /// Drop every cached catalog response.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// List products matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(query = %filter.cache_key(), request_id = tracing::field::Empty))]
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, ApiError> {
        let cache_key = CacheKey::Products(filter.cache_key());

        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = self.endpoint(&["api", "products"])?;
        let query = filter.to_query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let page: Page<Product> = self.get::<Listing<Product>>(url).await?.into();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;
        Ok(page)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown slug, or another error if
    /// the API request fails.
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn product_by_slug(&self, slug: &str) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(slug.to_string());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&["api", "products", slug])?;
        let product: Product = self.get(url).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// List product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let url = self.endpoint(&["api", "categories"])?;
        let categories = Page::from(self.get::<Listing<Category>>(url).await?).results;

        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    // =========================================================================
    // Shipping Methods
    // =========================================================================

    /// List shipping methods.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn shipping_methods(&self) -> Result<Vec<ShippingMethod>, ApiError> {
        if let Some(CacheValue::ShippingMethods(methods)) =
            self.inner.cache.get(&CacheKey::ShippingMethods).await
        {
            debug!("Cache hit for shipping methods");
            return Ok(methods);
        }

        let url = self.endpoint(&["api", "shipping-methods"])?;
        let methods = Page::from(self.get::<Listing<ShippingMethod>>(url).await?).results;

        self.inner
            .cache
            .insert(
                CacheKey::ShippingMethods,
                CacheValue::ShippingMethods(methods.clone()),
            )
            .await;
        Ok(methods)
    }

    /// Quote a shipping method for a number of items.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn shipping_quote(
        &self,
        method: ShippingMethodId,
        quantity: u32,
    ) -> Result<ShippingQuote, ApiError> {
        let id = method.to_string();
        let mut url = self.endpoint(&["api", "shipping-methods", &id, "price-for-quantity"])?;
        url.query_pairs_mut()
            .append_pair("quantity", &quantity.to_string());
        self.get(url).await
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// List active coupons. Entries the client cannot interpret are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn coupons(&self) -> Result<Vec<Coupon>, ApiError> {
        let url = self.endpoint(&["api", "coupons"])?;
        let raw = Page::from(self.get::<Listing<serde_json::Value>>(url).await?).results;

        Ok(raw
            .into_iter()
            .filter_map(|value| {
                serde_json::from_value::<Coupon>(value)
                    .inspect_err(|e| warn!(error = %e, "Skipping unreadable coupon"))
                    .ok()
            })
            .collect())
    }

    /// Ask the backend whether a coupon applies to a cart.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown or inactive codes, or
    /// another error if the API request fails.
    #[instrument(skip(self, request), fields(code = %request.coupon_code, request_id = tracing::field::Empty))]
    pub async fn validate_coupon(
        &self,
        request: &CouponValidationRequest,
    ) -> Result<CouponValidationResponse, ApiError> {
        let url = self.endpoint(&["api", "coupons", "validate"])?;
        self.post(url, request).await
    }

    // =========================================================================
    // Payments and Orders
    // =========================================================================

    /// List the merchant's payment accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn payment_accounts(&self) -> Result<Vec<PaymentAccount>, ApiError> {
        let url = self.endpoint(&["api", "payment", "accounts"])?;
        Ok(Page::from(self.get::<Listing<PaymentAccount>>(url).await?).results)
    }

    /// Submit an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order or the request fails.
    #[instrument(skip(self, payload), fields(items = payload.items.len(), request_id = tracing::field::Empty))]
    pub async fn submit_order(&self, payload: &OrderPayload) -> Result<OrderConfirmation, ApiError> {
        let url = self.endpoint(&["api", "orders", "submit"])?;
        self.post(url, payload).await
    }

    /// List the authenticated customer's orders.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] without a valid token, or another
    /// error if the API request fails.
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        let url = self.endpoint(&["api", "orders"])?;
        Ok(Page::from(self.get::<Listing<Order>>(url).await?).results)
    }

    /// Get one order by its number.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown order, or another error
    /// if the API request fails.
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn order(&self, order_number: &str) -> Result<Order, ApiError> {
        let url = self.endpoint(&["api", "orders", order_number])?;
        self.get(url).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&StorefrontConfig::for_api(base).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_has_trailing_slash() {
        let api = client("http://127.0.0.1:8000/");
        assert_eq!(
            api.endpoint(&["api", "products"]).unwrap().as_str(),
            "http://127.0.0.1:8000/api/products/"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_segments() {
        let api = client("http://shop.test/backend");
        assert_eq!(
            api.endpoint(&["api", "products", "red shirt/2"])
                .unwrap()
                .as_str(),
            "http://shop.test/backend/api/products/red%20shirt%2F2/"
        );
    }
}
