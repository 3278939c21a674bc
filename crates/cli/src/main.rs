//! Emporium CLI - Browse the catalog, manage the cart and place orders.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! emporium products --category shirts --sort price-asc
//! emporium product linen-shirt
//!
//! # Cart and wishlist
//! emporium cart add linen-shirt --quantity 2 --color Navy --size M
//! emporium wishlist add linen-shirt
//!
//! # Checkout
//! emporium checkout totals --shipping 1 --coupon SAVE10
//! emporium checkout submit --shipping 1 --first-name Ada ... --transaction-id TX12345
//! ```
//!
//! # Environment Variables
//!
//! - `EMPORIUM_API_URL` - Backend base URL
//! - `EMPORIUM_DATA_DIR` - Where the cart and wishlist are kept
//! - `SENTRY_DSN` - Error reporting (optional)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use emporium_storefront::Storefront;
use emporium_storefront::config::StorefrontConfig;
use emporium_storefront::error::StorefrontError;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::cart::{CartAction, WishlistAction};
use commands::catalog::ProductsArgs;
use commands::checkout::CheckoutAction;
use commands::orders::OrdersAction;

#[derive(Parser)]
#[command(name = "emporium")]
#[command(author, version, about = "Emporium storefront CLI")]
struct Cli {
    /// Backend base URL (overrides `EMPORIUM_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products(ProductsArgs),
    /// Show one product
    Product {
        /// Product slug
        slug: String,
    },
    /// List categories
    Categories,
    /// List shipping options priced for the current cart
    Shipping,
    /// List active coupons
    Coupons,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Show or change the wishlist
    Wishlist {
        #[command(subcommand)]
        action: Option<WishlistAction>,
    },
    /// Price and place an order for the cart
    Checkout {
        #[command(subcommand)]
        action: CheckoutAction,
    },
    /// Look up placed orders
    Orders {
        #[command(subcommand)]
        action: Option<OrdersAction>,
    },
    /// Accounts to send mobile payments to
    PaymentAccounts,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match load_config(cli.api_url.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("{e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "emporium_storefront=info,emporium_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    if let Err(e) = run(cli.command, config).await {
        e.report();
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn load_config(api_url: Option<&str>) -> Result<StorefrontConfig, StorefrontError> {
    let mut config = StorefrontConfig::from_env()?;
    if let Some(url) = api_url {
        config.api_url = StorefrontConfig::for_api(url)?.api_url;
    }
    Ok(config)
}

async fn run(command: Commands, config: StorefrontConfig) -> Result<(), StorefrontError> {
    let storefront = Storefront::new(config)?;

    match command {
        Commands::Products(args) => commands::catalog::products(&storefront, args).await?,
        Commands::Product { slug } => commands::catalog::product(&storefront, &slug).await?,
        Commands::Categories => commands::catalog::categories(&storefront).await?,
        Commands::Shipping => commands::checkout::shipping(&storefront).await?,
        Commands::Coupons => commands::checkout::coupons(&storefront).await?,
        Commands::Cart { action } => {
            commands::cart::cart(&storefront, action.unwrap_or(CartAction::Show)).await?;
        }
        Commands::Wishlist { action } => {
            commands::cart::wishlist(&storefront, action.unwrap_or(WishlistAction::Show)).await?;
        }
        Commands::Checkout { action } => commands::checkout::checkout(&storefront, action).await?,
        Commands::Orders { action } => {
            commands::orders::orders(&storefront, action.unwrap_or(OrdersAction::List)).await?;
        }
        Commands::PaymentAccounts => commands::orders::payment_accounts(&storefront).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
