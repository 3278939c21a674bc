//! Cart line items and cart list semantics.
//!
//! A cart is an ordered list of [`CartLineItem`]s, one per product variant
//! (product + color + size). The cart itself never touches storage; the
//! storefront crate persists it after every mutation.
//!
//! # Invariants
//!
//! - Every line has `quantity >= 1`. Setting a quantity of zero removes the
//!   line.
//! - Line keys are unique. Adding a variant that is already present merges
//!   into the existing line.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::money::lenient;
use crate::types::{ColorId, Money, ProductId, SizeId};

/// Placeholder used in line keys when a variant has no color or size.
const NO_OPTION: &str = "default";

// =============================================================================
// Variant Options
// =============================================================================

/// A color chosen for a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorOption {
    pub id: ColorId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex_code: Option<String>,
}

/// A size chosen for a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeOption {
    pub id: SizeId,
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Line Item Key
// =============================================================================

/// Composite identity of a line item: `{product}_{size}_{color}`.
///
/// ```
/// use emporium_core::cart::LineItemKey;
/// use emporium_core::{ColorId, ProductId};
///
/// let key = LineItemKey::new(ProductId::new(7), Some(ColorId::new(2)), None);
/// assert_eq!(key.as_str(), "7_default_2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemKey(String);

impl LineItemKey {
    /// Build the key for a product variant.
    #[must_use]
    pub fn new(product: ProductId, color: Option<ColorId>, size: Option<SizeId>) -> Self {
        let size = size.map_or_else(|| NO_OPTION.to_string(), |s| s.to_string());
        let color = color.map_or_else(|| NO_OPTION.to_string(), |c| c.to_string());
        Self(format!("{product}_{size}_{color}"))
    }

    /// Wrap an existing key string, e.g. one typed on the command line.
    #[must_use]
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// One product variant and its quantity in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Composite variant key.
    #[serde(rename = "variantId")]
    pub key: LineItemKey,
    /// Backend product id.
    pub product_id: ProductId,
    /// Product name at the time it was added.
    pub name: String,
    /// Unit price at the time it was added.
    pub unit_price: Money,
    /// Number of units (always at least 1).
    pub quantity: u32,
    /// Selected color, if the product has colors.
    #[serde(default, rename = "selectedColor", skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorOption>,
    /// Selected size, if the product has sizes.
    #[serde(default, rename = "selectedSize", skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeOption>,
    /// Product slug for linking back to the product page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Thumbnail image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl CartLineItem {
    /// Create a line item. A quantity of zero is treated as one.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
        color: Option<ColorOption>,
        size: Option<SizeOption>,
    ) -> Self {
        let key = LineItemKey::new(
            product_id,
            color.as_ref().map(|c| c.id),
            size.as_ref().map(|s| s.id),
        );
        Self {
            key,
            product_id,
            name: name.into(),
            unit_price,
            quantity: quantity.max(1),
            color,
            size,
            slug: None,
            thumbnail_url: None,
        }
    }

    /// Attach the product slug.
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Attach a thumbnail URL.
    #[must_use]
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

// =============================================================================
// Legacy Ingress
// =============================================================================

/// A stored line item in any of the shapes older clients wrote.
///
/// Prices have appeared as `price`, `unit_price` or `unitPrice`, as numbers
/// or strings, and the product id as `id`, `product_id` or `productId`.
/// [`RawLineItem::normalize`] maps all of them onto [`CartLineItem`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLineItem {
    #[serde(default, rename = "variantId")]
    variant_id: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    product_id: Option<Value>,
    #[serde(default, rename = "productId")]
    product_id_camel: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    unit_price: Option<Value>,
    #[serde(default, rename = "unitPrice")]
    unit_price_camel: Option<Value>,
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default, rename = "selectedColor")]
    selected_color: Option<ColorOption>,
    #[serde(default)]
    color_id: Option<ColorId>,
    #[serde(default, rename = "selectedSize")]
    selected_size: Option<SizeOption>,
    #[serde(default)]
    size_id: Option<SizeId>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default, alias = "thumbnailUrl")]
    thumbnail_url: Option<String>,
}

/// Why a stored line item could not be recovered.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LineItemError {
    /// No usable product id in any known field.
    #[error("line item has no product id")]
    MissingProductId,
}

fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn quantity_from_value(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .filter(|q| *q >= 1)
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1)
}

impl RawLineItem {
    /// Normalise into the canonical line item shape.
    ///
    /// Unparseable prices become zero, negative prices clamp to zero and
    /// unparseable or non-positive quantities become one.
    ///
    /// # Errors
    ///
    /// Returns [`LineItemError::MissingProductId`] if no product id can be
    /// found.
    pub fn normalize(self) -> Result<CartLineItem, LineItemError> {
        let product_id = [&self.product_id_camel, &self.product_id, &self.id]
            .into_iter()
            .flatten()
            .find_map(id_from_value)
            .map(ProductId::new)
            .ok_or(LineItemError::MissingProductId)?;

        let unit_price = [&self.unit_price_camel, &self.unit_price, &self.price]
            .into_iter()
            .flatten()
            .find_map(lenient::decimal_from_value)
            .map_or(Money::ZERO, Money::clamped);

        let color = self.selected_color.or_else(|| {
            self.color_id.map(|id| ColorOption {
                id,
                name: String::new(),
                hex_code: None,
            })
        });
        let size = self.selected_size.or_else(|| {
            self.size_id.map(|id| SizeOption {
                id,
                name: String::new(),
            })
        });

        let key = self.variant_id.map_or_else(
            || {
                LineItemKey::new(
                    product_id,
                    color.as_ref().map(|c| c.id),
                    size.as_ref().map(|s| s.id),
                )
            },
            LineItemKey,
        );

        Ok(CartLineItem {
            key,
            product_id,
            name: self.name.or(self.product_name).unwrap_or_default(),
            unit_price,
            quantity: quantity_from_value(self.quantity.as_ref()),
            color,
            size,
            slug: self.slug,
            thumbnail_url: self.thumbnail_url,
        })
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Result of changing a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// The line now has the given quantity.
    Updated(u32),
    /// The quantity was zero, so the line was removed.
    Removed,
}

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No line with this key exists.
    #[error("item not found in cart: {0}")]
    NotFound(LineItemKey),
}

/// The shopping cart: an ordered list of unique line items.
///
/// Deserialization accepts every legacy line shape via [`RawLineItem`];
/// lines without a product id are dropped and duplicate keys are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RawLineItem>", into = "Vec<CartLineItem>")]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from raw stored lines, returning how many were dropped.
    #[must_use]
    pub fn from_raw(raw: Vec<RawLineItem>) -> (Self, usize) {
        let mut cart = Self::new();
        let mut dropped = 0;
        for line in raw {
            match line.normalize() {
                Ok(item) => {
                    cart.add(item);
                }
                Err(_) => dropped += 1,
            }
        }
        (cart, dropped)
    }

    /// The line items, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Look up a line by key.
    #[must_use]
    pub fn get(&self, key: &LineItemKey) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.key == key)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// `Σ unit_price × quantity` over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        crate::totals::subtotal(&self.items)
    }

    /// Add a line, merging with an existing line for the same variant.
    ///
    /// Returns the resulting quantity of that line.
    pub fn add(&mut self, item: CartLineItem) -> u32 {
        if let Some(existing) = self.items.iter_mut().find(|i| i.key == item.key) {
            existing.quantity = existing.quantity.saturating_add(item.quantity.max(1));
            return existing.quantity;
        }
        let quantity = item.quantity.max(1);
        self.items.push(CartLineItem { quantity, ..item });
        quantity
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if no line has this key.
    pub fn set_quantity(
        &mut self,
        key: &LineItemKey,
        quantity: u32,
    ) -> Result<QuantityChange, CartError> {
        if quantity == 0 {
            return self
                .remove(key)
                .map(|_| QuantityChange::Removed)
                .ok_or_else(|| CartError::NotFound(key.clone()));
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| &i.key == key)
            .ok_or_else(|| CartError::NotFound(key.clone()))?;
        item.quantity = quantity;
        Ok(QuantityChange::Updated(quantity))
    }

    /// Remove a line, returning it if present.
    pub fn remove(&mut self, key: &LineItemKey) -> Option<CartLineItem> {
        let index = self.items.iter().position(|i| &i.key == key)?;
        Some(self.items.remove(index))
    }

    /// Remove every line whose key appears in `checked_out`.
    ///
    /// Used for partial clearing after a checkout that only covered part of
    /// the cart. Returns the number of lines removed.
    pub fn remove_checked_out(&mut self, checked_out: &[LineItemKey]) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !checked_out.contains(&item.key));
        before - self.items.len()
    }

    /// Remove all lines.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl From<Vec<RawLineItem>> for Cart {
    fn from(raw: Vec<RawLineItem>) -> Self {
        Self::from_raw(raw).0
    }
}

impl From<Cart> for Vec<CartLineItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

impl FromIterator<CartLineItem> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLineItem>>(iter: I) -> Self {
        let mut cart = Self::new();
        for item in iter {
            cart.add(item);
        }
        cart
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn money(cents: u32) -> Money {
        Money::from_cents(cents)
    }

    fn shirt(color: Option<i64>, quantity: u32) -> CartLineItem {
        CartLineItem::new(
            ProductId::new(1),
            "Shirt",
            money(2999),
            quantity,
            color.map(|id| ColorOption {
                id: ColorId::new(id),
                name: "Red".to_string(),
                hex_code: None,
            }),
            None,
        )
    }

    #[test]
    fn test_key_format() {
        let key = LineItemKey::new(ProductId::new(5), Some(ColorId::new(3)), Some(SizeId::new(9)));
        assert_eq!(key.as_str(), "5_9_3");
        assert_eq!(
            LineItemKey::new(ProductId::new(5), None, None).as_str(),
            "5_default_default"
        );
    }

    #[test]
    fn test_add_merges_same_variant() {
        let mut cart = Cart::new();
        cart.add(shirt(Some(1), 1));
        assert_eq!(cart.add(shirt(Some(1), 2)), 3);
        cart.add(shirt(Some(2), 1));

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_zero_quantity_add_counts_as_one() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(shirt(None, 0)), 1);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        let item = shirt(None, 1);
        let key = item.key.clone();
        cart.add(item);

        assert_eq!(cart.set_quantity(&key, 4), Ok(QuantityChange::Updated(4)));
        assert_eq!(cart.set_quantity(&key, 0), Ok(QuantityChange::Removed));
        assert!(cart.is_empty());
        assert_eq!(
            cart.set_quantity(&key, 1),
            Err(CartError::NotFound(key.clone()))
        );
    }

    #[test]
    fn test_subtotal() {
        let mut cart = Cart::new();
        cart.add(CartLineItem::new(ProductId::new(1), "A", money(2999), 2, None, None));
        cart.add(CartLineItem::new(ProductId::new(2), "B", money(4999), 1, None, None));
        assert_eq!(cart.subtotal().amount(), Decimal::new(10997, 2));
    }

    #[test]
    fn test_remove_checked_out() {
        let mut cart = Cart::new();
        let a = shirt(Some(1), 1);
        let b = shirt(Some(2), 1);
        let a_key = a.key.clone();
        cart.add(a);
        cart.add(b);

        assert_eq!(cart.remove_checked_out(&[a_key]), 1);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_legacy_shapes_normalize() {
        let json = r#"[
            {"id": 4, "variantId": "4_default_default", "name": "Mug", "price": "12.50", "quantity": "2"},
            {"product_id": "9", "name": "Cap", "unit_price": 8, "quantity": 0, "color_id": 3},
            {"name": "Ghost", "price": 1}
        ]"#;
        let raw: Vec<RawLineItem> = serde_json::from_str(json).unwrap();
        let (cart, dropped) = Cart::from_raw(raw);

        assert_eq!(dropped, 1);
        assert_eq!(cart.len(), 2);

        let mug = &cart.items()[0];
        assert_eq!(mug.unit_price, money(1250));
        assert_eq!(mug.quantity, 2);

        let cap = &cart.items()[1];
        assert_eq!(cap.key.as_str(), "9_default_3");
        assert_eq!(cap.quantity, 1);
        assert_eq!(cap.unit_price.amount(), Decimal::new(8, 0));
    }

    #[test]
    fn test_negative_and_garbage_prices_clamp_to_zero() {
        let raw: Vec<RawLineItem> = serde_json::from_str(
            r#"[{"id": 1, "price": -5, "quantity": 1}, {"id": 2, "price": "abc", "quantity": 1}]"#,
        )
        .unwrap();
        let (cart, _) = Cart::from_raw(raw);
        assert!(cart.items().iter().all(|i| i.unit_price.is_zero()));
    }

    #[test]
    fn test_huge_stored_price_saturates_subtotal() {
        let raw: Vec<RawLineItem> = serde_json::from_str(
            r#"[{"id": 1, "price": "79228162514264337593543950335", "quantity": 2}]"#,
        )
        .unwrap();
        let (cart, dropped) = Cart::from_raw(raw);
        assert_eq!(dropped, 0);
        assert_eq!(cart.subtotal(), Money::MAX);
    }

    #[test]
    fn test_canonical_shape_survives_storage() {
        let mut cart = Cart::new();
        cart.add(shirt(Some(1), 2).with_slug("shirt"));

        let json = serde_json::to_string(&cart).unwrap();
        assert!(json.contains("\"variantId\":\"1_default_1\""));
        assert!(json.contains("\"unitPrice\":\"29.99\""));

        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}
