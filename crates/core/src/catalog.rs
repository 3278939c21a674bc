//! Products, categories, listing filters and pagination.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cart::{CartLineItem, ColorOption, SizeOption};
use crate::types::money::lenient;
use crate::types::{CategoryId, Money, ProductId};
use crate::wishlist::WishlistItem;

// =============================================================================
// Products
// =============================================================================

/// A product as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "lenient")]
    pub price: Money,
    /// Sale price, when the product is discounted.
    #[serde(default, deserialize_with = "optional_price")]
    pub discount_price: Option<Money>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub colors: Vec<ColorOption>,
    #[serde(default)]
    pub sizes: Vec<SizeOption>,
}

fn optional_price<'de, D>(deserializer: D) -> Result<Option<Money>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(lenient::decimal_from_value(&value).map(Money::clamped))
}

impl Product {
    /// The price a customer pays: the sale price when lower, else the list price.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        match self.discount_price {
            Some(sale) if !sale.is_zero() && sale < self.price => sale,
            _ => self.price,
        }
    }

    /// Whether the product is known to be out of stock.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.stock == Some(0)
    }

    /// Look up a color by id or case-insensitive name.
    #[must_use]
    pub fn find_color(&self, needle: &str) -> Option<&ColorOption> {
        self.colors
            .iter()
            .find(|c| c.id.to_string() == needle || c.name.eq_ignore_ascii_case(needle))
    }

    /// Look up a size by id or case-insensitive name.
    #[must_use]
    pub fn find_size(&self, needle: &str) -> Option<&SizeOption> {
        self.sizes
            .iter()
            .find(|s| s.id.to_string() == needle || s.name.eq_ignore_ascii_case(needle))
    }

    /// A cart line for this product at its effective price.
    #[must_use]
    pub fn to_line_item(
        &self,
        quantity: u32,
        color: Option<ColorOption>,
        size: Option<SizeOption>,
    ) -> CartLineItem {
        let mut item = CartLineItem::new(
            self.id,
            self.name.clone(),
            self.effective_price(),
            quantity,
            color,
            size,
        );
        if !self.slug.is_empty() {
            item = item.with_slug(self.slug.clone());
        }
        if let Some(url) = &self.thumbnail_url {
            item = item.with_thumbnail(url.clone());
        }
        item
    }

    /// A wishlist entry for this product.
    #[must_use]
    pub fn to_wishlist_item(&self) -> WishlistItem {
        WishlistItem {
            product_id: self.id,
            name: self.name.clone(),
            price: self.effective_price(),
            slug: (!self.slug.is_empty()).then(|| self.slug.clone()),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<Category>,
}

// =============================================================================
// Pagination
// =============================================================================

/// A page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total results across all pages.
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Whether another page follows.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// A listing response: either a paginated envelope or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Paginated(Page<T>),
    Bare(Vec<T>),
}

impl<T> From<Listing<T>> for Page<T> {
    fn from(listing: Listing<T>) -> Self {
        match listing {
            Listing::Paginated(page) => page,
            Listing::Bare(results) => Self {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        }
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Sort orders offered on product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl ProductSort {
    /// The backend `ordering` parameter for this sort.
    #[must_use]
    pub const fn ordering(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price",
            Self::PriceDesc => "-price",
            Self::NameAsc => "name",
            Self::NameDesc => "-name",
        }
    }

    /// The sort key as typed by users (e.g. `price-asc`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
        }
    }
}

impl fmt::Display for ProductSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised sort key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sort `{0}` (expected price-asc, price-desc, name-asc or name-desc)")]
pub struct UnknownSort(pub String);

impl FromStr for ProductSort {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price-asc" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            "name-asc" => Ok(Self::NameAsc),
            "name-desc" => Ok(Self::NameDesc),
            _ => Err(UnknownSort(s.to_string())),
        }
    }
}

/// Filters for the product listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub page: Option<u32>,
    pub category: Option<String>,
    pub brands: Vec<String>,
    pub colors: Vec<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: Option<ProductSort>,
    pub search: Option<String>,
}

impl ProductFilter {
    /// Query parameters in a stable order. Empty filters are omitted.
    ///
    /// ```
    /// use emporium_core::catalog::{ProductFilter, ProductSort};
    ///
    /// let filter = ProductFilter {
    ///     brands: vec!["acme".into(), "globex".into()],
    ///     sort: Some(ProductSort::PriceDesc),
    ///     ..ProductFilter::default()
    /// };
    /// assert_eq!(
    ///     filter.to_query(),
    ///     vec![
    ///         ("brands".to_string(), "acme,globex".to_string()),
    ///         ("ordering".to_string(), "-price".to_string()),
    ///     ]
    /// );
    /// ```
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        let mut push = |key: &str, value: String| query.push((key.to_string(), value));

        if let Some(page) = self.page {
            push("page", page.to_string());
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            push("category", category.trim().to_string());
        }
        if !self.brands.is_empty() {
            push("brands", self.brands.join(","));
        }
        if !self.colors.is_empty() {
            push("colors", self.colors.join(","));
        }
        if let Some(min) = self.min_price {
            push("min_price", min.amount().to_string());
        }
        if let Some(max) = self.max_price {
            push("max_price", max.amount().to_string());
        }
        if let Some(sort) = self.sort {
            push("ordering", sort.ordering().to_string());
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            push("search", search.trim().to_string());
        }
        query
    }

    /// Stable cache key for this filter.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.to_query()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PRODUCT: &str = r##"{
        "id": 12,
        "name": "Linen Shirt",
        "slug": "linen-shirt",
        "price": "49.99",
        "discount_price": "39.99",
        "stock": 4,
        "thumbnail_url": null,
        "colors": [{"id": 2, "name": "Navy", "hex_code": "#001f3f"}],
        "sizes": [{"id": 3, "name": "M"}]
    }"##;

    #[test]
    fn test_product_effective_price() {
        let product: Product = serde_json::from_str(PRODUCT).unwrap();
        assert_eq!(product.effective_price(), Money::from_cents(3999));
        assert!(!product.is_sold_out());
    }

    #[test]
    fn test_find_variant_options() {
        let product: Product = serde_json::from_str(PRODUCT).unwrap();
        assert_eq!(product.find_color("navy").unwrap().id.as_i64(), 2);
        assert_eq!(product.find_size("3").unwrap().name, "M");
        assert!(product.find_size("XL").is_none());
    }

    #[test]
    fn test_to_line_item() {
        let product: Product = serde_json::from_str(PRODUCT).unwrap();
        let color = product.colors.first().cloned();
        let item = product.to_line_item(2, color, None);
        assert_eq!(item.key.as_str(), "12_default_2");
        assert_eq!(item.line_total(), Money::from_cents(7998));
        assert_eq!(item.slug.as_deref(), Some("linen-shirt"));
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let bare: Listing<Category> =
            serde_json::from_str(r#"[{"id": 1, "name": "Shirts"}]"#).unwrap();
        let page: Page<Category> = bare.into();
        assert_eq!(page.count, 1);
        assert!(!page.has_next());

        let paginated: Listing<Category> = serde_json::from_str(
            r#"{"count": 30, "next": "http://x/?page=2", "previous": null, "results": [{"id": 1, "name": "Shirts"}]}"#,
        )
        .unwrap();
        let page: Page<Category> = paginated.into();
        assert_eq!(page.count, 30);
        assert!(page.has_next());
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("price-asc".parse::<ProductSort>().unwrap().ordering(), "price");
        assert_eq!("Name-Desc".parse::<ProductSort>().unwrap().ordering(), "-name");
        assert!("newest".parse::<ProductSort>().is_err());
    }

    #[test]
    fn test_empty_filter_has_no_query() {
        assert!(ProductFilter::default().to_query().is_empty());
        let filter = ProductFilter {
            category: Some("  ".to_string()),
            min_price: Some(Money::from_cents(1000)),
            ..ProductFilter::default()
        };
        assert_eq!(filter.cache_key(), "min_price=10.00");
    }
}
