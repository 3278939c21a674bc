//! Versioned, observable stores persisted through a [`KeyValueStore`].
//!
//! A [`PersistentStore`] owns one JSON document. Every mutation writes the
//! whole document back ("last write wins"), bumps a version counter and
//! notifies subscribers through a `tokio::sync::watch` channel.
//!
//! Stored data that cannot be decoded is logged, removed from storage and
//! replaced with the empty default. It is never a fatal error.

use std::sync::{Arc, Mutex, PoisonError};

use emporium_core::cart::{
    Cart, CartError, CartLineItem, LineItemKey, QuantityChange, RawLineItem,
};
use emporium_core::wishlist::{Wishlist, WishlistItem};
use emporium_core::{Money, ProductId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::error::add_breadcrumb;
use crate::storage::{CART_KEY, KeyValueStore, StorageError, WISHLIST_KEY};

/// A value together with the version it was published at.
#[derive(Debug)]
pub struct Snapshot<T> {
    /// Starts at 0 when the store is opened; +1 per mutation.
    pub version: u64,
    pub value: Arc<T>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            value: Arc::clone(&self.value),
        }
    }
}

/// A persisted document with change notification.
///
/// Clones share the same state.
pub struct PersistentStore<T> {
    inner: Arc<StoreInner<T>>,
}

struct StoreInner<T> {
    key: String,
    backend: Arc<dyn KeyValueStore>,
    state: watch::Sender<Snapshot<T>>,
    write_lock: Mutex<()>,
}

impl<T> Clone for PersistentStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PersistentStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static,
{
    /// Load `key` from `backend`, falling back to the default on missing or
    /// corrupt data.
    pub fn open(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self::open_with(backend, key, |raw| serde_json::from_str(raw))
    }

    /// Like [`PersistentStore::open`], decoding stored text with `decode`.
    pub fn open_with(
        backend: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        decode: impl FnOnce(&str) -> serde_json::Result<T>,
    ) -> Self {
        let key = key.into();
        let value = load(backend.as_ref(), &key, decode);
        let (state, _) = watch::channel(Snapshot {
            version: 0,
            value: Arc::new(value),
        });
        Self {
            inner: Arc::new(StoreInner {
                key,
                backend,
                state,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// The storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.inner.state.borrow().value)
    }

    /// The current value and its version.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        self.inner.state.borrow().clone()
    }

    /// The current version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.state.borrow().version
    }

    /// Watch for new snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.inner.state.subscribe()
    }

    /// Replace the value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the value could not be persisted. The
    /// in-memory value and version are updated regardless.
    pub fn set(&self, value: T) -> Result<(), StorageError> {
        self.update(|current| *current = value)
    }

    /// Reset to the default value.
    ///
    /// # Errors
    ///
    /// See [`PersistentStore::set`].
    pub fn reset(&self) -> Result<(), StorageError> {
        self.set(T::default())
    }

    /// Mutate the value in place and persist the result.
    ///
    /// # Errors
    ///
    /// See [`PersistentStore::set`].
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StorageError> {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = self.snapshot();
        let mut value = T::clone(&current.value);
        let result = f(&mut value);
        let persisted = self.persist(&value);
        let version = current.version + 1;

        self.inner.state.send_replace(Snapshot {
            version,
            value: Arc::new(value),
        });
        debug!(key = %self.inner.key, version, "Store updated");

        persisted.map(|()| result)
    }

    fn persist(&self, value: &T) -> Result<(), StorageError> {
        let key = &self.inner.key;
        let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.clone(),
            source,
        })?;
        self.inner.backend.set(key, &encoded).inspect_err(|e| {
            error!(key = %key, error = %e, "Failed to persist store");
        })
    }
}

fn load<T: Default>(
    backend: &dyn KeyValueStore,
    key: &str,
    decode: impl FnOnce(&str) -> serde_json::Result<T>,
) -> T {
    let decoded = match backend.get(key) {
        Ok(Some(raw)) => decode(&raw).map_err(|e| e.to_string()),
        Ok(None) => return T::default(),
        Err(e) => Err(e.to_string()),
    };

    decoded.unwrap_or_else(|error| {
        warn!(key, error = %error, "Discarding unreadable stored data");
        if let Err(e) = backend.remove(key) {
            warn!(key, error = %e, "Failed to clear unreadable stored data");
        }
        T::default()
    })
}

/// Decode stored cart lines, logging lines that had to be dropped.
fn decode_cart(raw: &str) -> serde_json::Result<Cart> {
    let lines: Vec<RawLineItem> = serde_json::from_str(raw)?;
    let (cart, dropped) = Cart::from_raw(lines);
    if dropped > 0 {
        warn!(dropped, "Dropped stored cart lines without a product");
    }
    Ok(cart)
}

// =============================================================================
// Cart Store
// =============================================================================

/// Errors from cart store operations.
#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The persisted cart.
#[derive(Clone)]
pub struct CartStore {
    store: PersistentStore<Cart>,
}

impl CartStore {
    /// Open the cart stored under `cartItems`.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: PersistentStore::open_with(backend, CART_KEY, decode_cart),
        }
    }

    /// The current cart.
    #[must_use]
    pub fn cart(&self) -> Arc<Cart> {
        self.store.get()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.store.version()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Cart>> {
        self.store.subscribe()
    }

    /// Total units in the cart.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.cart().item_count()
    }

    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.cart().subtotal()
    }

    /// Add a line, merging with an existing line for the same variant.
    /// Returns the resulting quantity of that line.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the cart could not be persisted.
    pub fn add(&self, item: CartLineItem) -> Result<u32, StorageError> {
        let product_id = item.product_id.to_string();
        let key = item.key.to_string();
        let quantity = self.store.update(|cart| cart.add(item))?;
        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[("product_id", &product_id), ("variant", &key)]),
        );
        Ok(quantity)
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartStoreError::Cart`] if the line does not exist, or
    /// [`CartStoreError::Storage`] if the cart could not be persisted.
    pub fn set_quantity(
        &self,
        key: &LineItemKey,
        quantity: u32,
    ) -> Result<QuantityChange, CartStoreError> {
        if self.cart().get(key).is_none() {
            return Err(CartError::NotFound(key.clone()).into());
        }
        Ok(self.store.update(|cart| cart.set_quantity(key, quantity))??)
    }

    /// Remove a line, returning it if it was present.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the cart could not be persisted.
    pub fn remove(&self, key: &LineItemKey) -> Result<Option<CartLineItem>, StorageError> {
        self.store.update(|cart| cart.remove(key))
    }

    /// Remove the lines that were just checked out.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the cart could not be persisted.
    pub fn remove_checked_out(&self, keys: &[LineItemKey]) -> Result<usize, StorageError> {
        self.store.update(|cart| cart.remove_checked_out(keys))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the cart could not be persisted.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.reset()
    }
}

// =============================================================================
// Wishlist Store
// =============================================================================

/// The persisted wishlist.
#[derive(Clone)]
pub struct WishlistStore {
    store: PersistentStore<Wishlist>,
}

impl WishlistStore {
    /// Open the wishlist stored under `wishlistItems`.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: PersistentStore::open(backend, WISHLIST_KEY),
        }
    }

    #[must_use]
    pub fn wishlist(&self) -> Arc<Wishlist> {
        self.store.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Wishlist>> {
        self.store.subscribe()
    }

    /// Save a product. Returns `false` if it was already saved.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the wishlist could not be persisted.
    pub fn add(&self, item: WishlistItem) -> Result<bool, StorageError> {
        if self.wishlist().contains(item.product_id) {
            return Ok(false);
        }
        self.store.update(|list| list.add(item))
    }

    /// Remove a product. Returns `false` if it was not saved.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the wishlist could not be persisted.
    pub fn remove(&self, product_id: ProductId) -> Result<bool, StorageError> {
        self.store.update(|list| list.remove(product_id))
    }

    /// Empty the wishlist.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the wishlist could not be persisted.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.reset()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::cart::{ColorOption, SizeOption};
    use emporium_core::{ColorId, SizeId};

    use super::*;
    use crate::storage::{FileStore, MemoryStore};

    fn tee(quantity: u32) -> CartLineItem {
        CartLineItem::new(
            ProductId::new(1),
            "Tee",
            Money::from_cents(2999),
            quantity,
            Some(ColorOption {
                id: ColorId::new(3),
                name: "Red".to_string(),
                hex_code: None,
            }),
            Some(SizeOption {
                id: SizeId::new(2),
                name: "M".to_string(),
            }),
        )
    }

    #[test]
    fn test_mutations_persist_and_bump_version() {
        let backend = MemoryStore::new();
        let store = CartStore::open(Arc::new(backend.clone()));
        assert_eq!(store.version(), 0);

        assert_eq!(store.add(tee(1)).unwrap(), 1);
        assert_eq!(store.add(tee(2)).unwrap(), 3);
        assert_eq!(store.version(), 2);
        assert_eq!(store.cart().len(), 1);

        let stored = backend.get(CART_KEY).unwrap().unwrap();
        let reopened = CartStore::open(Arc::new(MemoryStore::with_entry(CART_KEY, &stored)));
        assert_eq!(reopened.item_count(), 3);
        assert_eq!(reopened.subtotal(), Money::from_cents(8997));
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let store = CartStore::open(Arc::new(MemoryStore::new()));
        store.add(tee(2)).unwrap();
        let key = LineItemKey::new(ProductId::new(1), Some(ColorId::new(3)), Some(SizeId::new(2)));
        assert_eq!(key.as_str(), "1_2_3");

        assert_eq!(
            store.set_quantity(&key, 5).unwrap(),
            QuantityChange::Updated(5)
        );
        assert_eq!(
            store.set_quantity(&key, 0).unwrap(),
            QuantityChange::Removed
        );
        assert!(store.cart().is_empty());
        assert!(matches!(
            store.set_quantity(&key, 1),
            Err(CartStoreError::Cart(CartError::NotFound(_)))
        ));
    }

    #[test]
    fn test_corrupt_data_resets_and_clears_key() {
        let backend = MemoryStore::with_entry(CART_KEY, "{not json");
        let store = CartStore::open(Arc::new(backend.clone()));
        assert!(store.cart().is_empty());
        assert_eq!(backend.get(CART_KEY).unwrap(), None);

        let backend = MemoryStore::with_entry(CART_KEY, r#"{"items": 3}"#);
        let store = CartStore::open(Arc::new(backend.clone()));
        assert!(store.cart().is_empty());
        assert_eq!(backend.get(CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_legacy_lines_normalised_on_open() {
        let backend = MemoryStore::with_entry(
            CART_KEY,
            r#"[
                {"id": 4, "name": "Mug", "price": "12.50", "quantity": "2"},
                {"name": "orphan", "price": 1}
            ]"#,
        );
        let store = CartStore::open(Arc::new(backend));
        let cart = store.cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.subtotal(), Money::from_cents(2500));
    }

    #[tokio::test]
    async fn test_subscribers_observe_snapshots() {
        let store = CartStore::open(Arc::new(MemoryStore::new()));
        let mut rx = store.subscribe();

        store.add(tee(1)).unwrap();
        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.value.item_count(), 1);

        store.clear().unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().version, 2);
        assert!(rx.borrow().value.is_empty());
    }

    #[test]
    fn test_remove_checked_out_keeps_other_lines() {
        let store = CartStore::open(Arc::new(MemoryStore::new()));
        let mug = CartLineItem::new(ProductId::new(9), "Mug", Money::from_cents(500), 1, None, None);
        store.add(tee(1)).unwrap();
        store.add(mug).unwrap();

        let removed = store
            .remove_checked_out(&[LineItemKey::new(ProductId::new(9), None, None)])
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.cart().len(), 1);
    }

    #[test]
    fn test_unreadable_file_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("{CART_KEY}.json"));
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        let store = CartStore::open(Arc::clone(&backend));
        assert!(store.cart().is_empty());
        assert!(!path.exists());
        assert_eq!(backend.get(CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_lines_without_product_are_dropped_on_open() {
        let backend = MemoryStore::with_entry(
            CART_KEY,
            r#"[{"name": "Ghost", "price": 1}, {"id": 4, "price": "12.50", "quantity": 2}]"#,
        );
        let store = CartStore::open(Arc::new(backend));
        assert_eq!(store.cart().len(), 1);
        assert_eq!(store.item_count(), 2);
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        CartStore::open(Arc::clone(&backend)).add(tee(2)).unwrap();
        assert_eq!(CartStore::open(backend).item_count(), 2);
    }

    #[test]
    fn test_wishlist_add_is_idempotent() {
        let store = WishlistStore::open(Arc::new(MemoryStore::new()));
        let item = WishlistItem {
            product_id: ProductId::new(7),
            name: "Lamp".to_string(),
            price: Money::from_cents(4500),
            slug: None,
            thumbnail_url: None,
        };
        assert!(store.add(item.clone()).unwrap());
        assert!(!store.add(item).unwrap());
        assert_eq!(store.wishlist().items().len(), 1);
        assert!(store.remove(ProductId::new(7)).unwrap());
    }
}
