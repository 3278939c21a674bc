//! Catalog browsing commands.
//!
//! # Usage
//!
//! ```bash
//! emporium products --category shirts --brand acme --sort price-asc --page 2
//! emporium products --search linen --max-price 50
//! emporium product linen-shirt
//! emporium categories
//! ```

use clap::Args;
use emporium_core::Money;
use emporium_core::catalog::{Category, ProductFilter, ProductSort};
use emporium_storefront::Storefront;
use emporium_storefront::error::Result;
use tracing::info;

/// Product listing filters.
#[derive(Args)]
pub struct ProductsArgs {
    /// Page number (1-based)
    #[arg(long)]
    page: Option<u32>,

    /// Category slug
    #[arg(long)]
    category: Option<String>,

    /// Brand filter (repeatable)
    #[arg(long = "brand")]
    brands: Vec<String>,

    /// Color filter (repeatable)
    #[arg(long = "color")]
    colors: Vec<String>,

    /// Minimum price
    #[arg(long, value_parser = Money::parse)]
    min_price: Option<Money>,

    /// Maximum price
    #[arg(long, value_parser = Money::parse)]
    max_price: Option<Money>,

    /// `price-asc`, `price-desc`, `name-asc` or `name-desc`
    #[arg(long)]
    sort: Option<ProductSort>,

    /// Free-text search
    #[arg(long)]
    search: Option<String>,
}

impl From<ProductsArgs> for ProductFilter {
    fn from(args: ProductsArgs) -> Self {
        Self {
            page: args.page,
            category: args.category,
            brands: args.brands,
            colors: args.colors,
            min_price: args.min_price,
            max_price: args.max_price,
            sort: args.sort,
            search: args.search,
        }
    }
}

/// List products matching the filters.
pub async fn products(storefront: &Storefront, args: ProductsArgs) -> Result<()> {
    let filter = ProductFilter::from(args);
    let page = storefront.api().list_products(&filter).await?;

    info!("{} product(s)", page.count);
    for product in &page.results {
        let sold_out = if product.is_sold_out() { "  [sold out]" } else { "" };
        match product.discount_price {
            Some(_) => info!(
                "  {:<32} {:>10} (was {}){}",
                product.slug,
                product.effective_price(),
                product.price,
                sold_out
            ),
            None => info!("  {:<32} {:>10}{}", product.slug, product.price, sold_out),
        }
    }
    if page.has_next() {
        info!("More results: --page {}", filter.page.unwrap_or(1) + 1);
    }
    Ok(())
}

/// Show one product with its options.
pub async fn product(storefront: &Storefront, slug: &str) -> Result<()> {
    let product = storefront.api().product_by_slug(slug).await?;

    info!("{} ({})", product.name, product.slug);
    if let Some(brand) = &product.brand {
        info!("  Brand:  {brand}");
    }
    info!("  Price:  {}", product.effective_price());
    match product.stock {
        Some(0) => info!("  Stock:  sold out"),
        Some(n) => info!("  Stock:  {n}"),
        None => {}
    }
    if !product.colors.is_empty() {
        let names: Vec<&str> = product.colors.iter().map(|c| c.name.as_str()).collect();
        info!("  Colors: {}", names.join(", "));
    }
    if !product.sizes.is_empty() {
        let names: Vec<&str> = product.sizes.iter().map(|s| s.name.as_str()).collect();
        info!("  Sizes:  {}", names.join(", "));
    }
    if !product.description.is_empty() {
        info!("");
        info!("{}", product.description);
    }
    Ok(())
}

/// List the category tree.
pub async fn categories(storefront: &Storefront) -> Result<()> {
    let categories = storefront.api().categories().await?;
    for category in &categories {
        print_category(category, 0);
    }
    Ok(())
}

fn print_category(category: &Category, depth: usize) {
    info!("{:indent$}{} ({})", "", category.name, category.slug, indent = depth * 2);
    for child in &category.subcategories {
        print_category(child, depth + 1);
    }
}
