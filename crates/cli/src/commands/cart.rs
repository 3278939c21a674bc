//! Cart and wishlist commands.
//!
//! # Usage
//!
//! ```bash
//! emporium cart add linen-shirt --quantity 2 --color Navy --size M
//! emporium cart set 12_3_2 1
//! emporium cart remove 12_3_2
//! emporium wishlist add linen-shirt
//! ```

use clap::Subcommand;
use emporium_core::ProductId;
use emporium_core::cart::{CartLineItem, LineItemKey, QuantityChange};
use emporium_core::catalog::Product;
use emporium_storefront::Storefront;
use emporium_storefront::error::{Result, StorefrontError};
use tracing::info;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        /// Product slug
        slug: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        /// Color name or id
        #[arg(long)]
        color: Option<String>,
        /// Size name or id
        #[arg(long)]
        size: Option<String>,
    },
    /// Change a line's quantity (0 removes it)
    Set {
        /// Line key as shown by `cart show`
        key: String,
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Line key as shown by `cart show`
        key: String,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Show the wishlist
    Show,
    /// Save a product
    Add {
        /// Product slug
        slug: String,
    },
    /// Forget a product
    Remove {
        /// Product id
        product_id: i64,
    },
    /// Empty the wishlist
    Clear,
}

pub async fn cart(storefront: &Storefront, action: CartAction) -> Result<()> {
    let store = storefront.cart();

    match action {
        CartAction::Show => {}
        CartAction::Add {
            slug,
            quantity,
            color,
            size,
        } => {
            let product = storefront.api().product_by_slug(&slug).await?;
            let item = line_for(&product, quantity, color.as_deref(), size.as_deref())?;
            let now = store.add(item)?;
            info!("Added {} (now {now} in cart)", product.name);
        }
        CartAction::Set { key, quantity } => {
            match store.set_quantity(&LineItemKey::from_raw(key), quantity)? {
                QuantityChange::Updated(n) => info!("Quantity set to {n}"),
                QuantityChange::Removed => info!("Removed from cart"),
            }
        }
        CartAction::Remove { key } => {
            let key = LineItemKey::from_raw(key);
            if store.remove(&key)?.is_none() {
                return Err(StorefrontError::BadRequest(format!(
                    "no cart line with key {key}"
                )));
            }
            info!("Removed from cart");
        }
        CartAction::Clear => {
            store.clear()?;
            info!("Cart cleared");
            return Ok(());
        }
    }

    show_cart(storefront);
    Ok(())
}

fn show_cart(storefront: &Storefront) {
    let cart = storefront.cart().cart();
    if cart.is_empty() {
        info!("Your cart is empty");
        return;
    }

    for item in cart.items() {
        let mut variant = Vec::new();
        if let Some(color) = &item.color {
            variant.push(color.name.as_str());
        }
        if let Some(size) = &item.size {
            variant.push(size.name.as_str());
        }
        info!(
            "  {:<16} {:<28} {:<12} {:>3} x {:>8} = {:>9}",
            item.key.as_str(),
            item.name,
            variant.join("/"),
            item.quantity,
            item.unit_price,
            item.line_total()
        );
    }
    info!(
        "{} item(s), subtotal {}",
        cart.item_count(),
        cart.subtotal().display_in(storefront.config().currency)
    );
}

/// Build a cart line, resolving the requested options against the product.
fn line_for(
    product: &Product,
    quantity: u32,
    color: Option<&str>,
    size: Option<&str>,
) -> Result<CartLineItem> {
    if product.is_sold_out() {
        return Err(StorefrontError::BadRequest(format!(
            "{} is sold out",
            product.name
        )));
    }
    if quantity == 0 {
        return Err(StorefrontError::BadRequest(
            "quantity must be at least 1".to_string(),
        ));
    }

    let color = match (color, product.colors.is_empty()) {
        (Some(needle), _) => Some(product.find_color(needle).cloned().ok_or_else(|| {
            StorefrontError::BadRequest(format!("{} has no color {needle}", product.name))
        })?),
        (None, false) => {
            return Err(StorefrontError::BadRequest(
                "Please select a color".to_string(),
            ));
        }
        (None, true) => None,
    };
    let size = match (size, product.sizes.is_empty()) {
        (Some(needle), _) => Some(product.find_size(needle).cloned().ok_or_else(|| {
            StorefrontError::BadRequest(format!("{} has no size {needle}", product.name))
        })?),
        (None, false) => {
            return Err(StorefrontError::BadRequest(
                "Please select a size".to_string(),
            ));
        }
        (None, true) => None,
    };

    Ok(product.to_line_item(quantity, color, size))
}

pub async fn wishlist(storefront: &Storefront, action: WishlistAction) -> Result<()> {
    let store = storefront.wishlist();

    match action {
        WishlistAction::Show => {
            let wishlist = store.wishlist();
            if wishlist.items().is_empty() {
                info!("Your wishlist is empty");
            }
            for item in wishlist.items() {
                info!("  {:>6}  {:<32} {:>9}", item.product_id.as_i64(), item.name, item.price);
            }
        }
        WishlistAction::Add { slug } => {
            let product = storefront.api().product_by_slug(&slug).await?;
            if store.add(product.to_wishlist_item())? {
                info!("Saved {} to your wishlist", product.name);
            } else {
                info!("{} is already in your wishlist", product.name);
            }
        }
        WishlistAction::Remove { product_id } => {
            if store.remove(ProductId::new(product_id))? {
                info!("Removed from wishlist");
            } else {
                info!("Not in your wishlist");
            }
        }
        WishlistAction::Clear => {
            store.clear()?;
            info!("Wishlist cleared");
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::cart::{ColorOption, SizeOption};
    use emporium_core::{ColorId, Money, SizeId};

    use super::*;

    fn shirt() -> Product {
        Product {
            id: ProductId::new(12),
            name: "Linen Shirt".to_string(),
            slug: "linen-shirt".to_string(),
            description: String::new(),
            price: Money::from_cents(4999),
            discount_price: None,
            stock: Some(3),
            thumbnail_url: None,
            brand: None,
            colors: vec![ColorOption {
                id: ColorId::new(2),
                name: "Navy".to_string(),
                hex_code: None,
            }],
            sizes: vec![SizeOption {
                id: SizeId::new(3),
                name: "M".to_string(),
            }],
        }
    }

    #[test]
    fn test_line_for_resolves_options_by_name() {
        let item = line_for(&shirt(), 2, Some("navy"), Some("M")).unwrap();
        assert_eq!(item.key.as_str(), "12_3_2");
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_line_for_requires_options() {
        let err = line_for(&shirt(), 1, None, Some("M")).unwrap_err();
        assert_eq!(err.to_string(), "Bad request: Please select a color");

        let err = line_for(&shirt(), 1, Some("Red"), Some("M")).unwrap_err();
        assert!(err.to_string().contains("has no color Red"));
    }

    #[test]
    fn test_line_for_rejects_sold_out() {
        let mut product = shirt();
        product.stock = Some(0);
        assert!(line_for(&product, 1, Some("Navy"), Some("M")).is_err());
    }
}
