//! Cache types for catalog responses.

use emporium_core::catalog::{Category, Page, Product};
use emporium_core::shipping::ShippingMethod;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(String),
    /// Listing keyed by the filter's query string.
    Products(String),
    Categories,
    ShippingMethods,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    Categories(Vec<Category>),
    ShippingMethods(Vec<ShippingMethod>),
}
