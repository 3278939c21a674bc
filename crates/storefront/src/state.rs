//! Client state shared across front ends.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::checkout::CheckoutSession;
use crate::config::StorefrontConfig;
use crate::coupons::CouponService;
use crate::error::StorefrontError;
use crate::shipping::ShippingService;
use crate::storage::{FileStore, KeyValueStore};
use crate::store::{CartStore, WishlistStore};

/// Everything a front end needs: the API client and the persisted stores.
///
/// Cheaply cloneable via `Arc`. Clones share the same cart and wishlist, so
/// a change made through one is seen by every subscriber.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    api: ApiClient,
    cart: CartStore,
    wishlist: WishlistStore,
}

impl Storefront {
    /// Open the stores under `config.data_dir` and build the API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or the API
    /// client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StorefrontError> {
        let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.data_dir.clone())?);
        Self::with_backend(config, backend)
    }

    /// Like [`Storefront::new`] but persisting to `backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn with_backend(
        config: StorefrontConfig,
        backend: Arc<dyn KeyValueStore>,
    ) -> Result<Self, StorefrontError> {
        let api = ApiClient::new(&config)?;
        let cart = CartStore::open(Arc::clone(&backend));
        let wishlist = WishlistStore::open(backend);

        tracing::debug!(
            api = %config.api_base(),
            cart_items = cart.cart().len(),
            "Storefront state loaded"
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                cart,
                wishlist,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn coupons(&self) -> CouponService {
        CouponService::new(self.inner.api.clone())
    }

    #[must_use]
    pub fn shipping(&self) -> ShippingService {
        ShippingService::new(self.inner.api.clone())
    }

    /// Start a checkout over the shared cart.
    #[must_use]
    pub fn checkout(&self) -> CheckoutSession {
        CheckoutSession::new(self.inner.api.clone(), self.inner.cart.clone())
    }
}
