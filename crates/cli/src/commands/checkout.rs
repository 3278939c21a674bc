//! Shipping, coupon and checkout commands.
//!
//! Nothing about a checkout is kept between invocations except the cart, so
//! the shipping method and coupon are passed on each call.
//!
//! # Usage
//!
//! ```bash
//! emporium shipping
//! emporium checkout totals --shipping 1 --coupon SAVE10
//! emporium checkout submit --shipping 1 --coupon SAVE10 \
//!     --first-name Ada --last-name Lovelace --email ada@example.com \
//!     --phone 01712345678 --street "12 Lake Rd" --city Dhaka --state Dhaka \
//!     --zip 1207 --payment-method bkash --sender-number 01712345678 \
//!     --transaction-id TX12345
//! ```

use clap::{Args, Subcommand};
use emporium_core::checkout::{CustomerDetails, PaymentDetails};
use emporium_core::coupon::CouponOutcome;
use emporium_core::totals::TotalsBreakdown;
use emporium_core::{CurrencyCode, PaymentMethod, ShippingMethodId};
use emporium_storefront::Storefront;
use emporium_storefront::checkout::CheckoutSession;
use emporium_storefront::error::{Result, StorefrontError};
use tracing::{info, warn};

#[derive(Subcommand)]
pub enum CheckoutAction {
    /// Show what the cart would cost
    Totals(Selection),
    /// Place the order
    Submit {
        #[command(flatten)]
        selection: Selection,
        #[command(flatten)]
        customer: CustomerArgs,
        #[command(flatten)]
        payment: PaymentArgs,
    },
}

/// Shipping method and coupon for this checkout.
#[derive(Args)]
pub struct Selection {
    /// Shipping method id (see `emporium shipping`)
    #[arg(long)]
    shipping: Option<ShippingMethodId>,

    /// Coupon code
    #[arg(long)]
    coupon: Option<String>,
}

#[derive(Args)]
pub struct CustomerArgs {
    #[arg(long, default_value = "")]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long = "street", default_value = "")]
    street_address: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    state: String,
    #[arg(long = "zip", default_value = "")]
    zip_code: String,
    /// Defaults to Bangladesh
    #[arg(long)]
    country: Option<String>,
}

impl From<CustomerArgs> for CustomerDetails {
    fn from(args: CustomerArgs) -> Self {
        Self {
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email,
            phone: args.phone,
            street_address: args.street_address,
            city: args.city,
            state: args.state,
            zip_code: args.zip_code,
            country: args.country,
        }
    }
}

#[derive(Args)]
pub struct PaymentArgs {
    /// `bkash`, `nagad` or `rocket`
    #[arg(long)]
    payment_method: Option<PaymentMethod>,

    /// Number the payment was sent from
    #[arg(long, default_value = "")]
    sender_number: String,

    /// Provider transaction id
    #[arg(long, default_value = "")]
    transaction_id: String,

    /// Account the payment was sent to (see `emporium payment-accounts`)
    #[arg(long)]
    account_number: Option<String>,
}

impl From<PaymentArgs> for PaymentDetails {
    fn from(args: PaymentArgs) -> Self {
        Self {
            sender_number: args.sender_number,
            transaction_id: args.transaction_id,
            payment_method: args.payment_method,
            admin_account_number: args.account_number,
        }
    }
}

/// List shipping options priced for the current cart.
pub async fn shipping(storefront: &Storefront) -> Result<()> {
    let quantity = storefront.cart().item_count();
    let options = storefront.shipping().calculate_options(quantity).await?;

    if options.is_empty() {
        info!("No shipping methods available");
    }
    for option in &options {
        let tiered = if option.has_tiers && option.price != option.base_price {
            format!(" (base {})", option.base_price)
        } else {
            String::new()
        };
        info!(
            "  {:>4}  {:<24} {:>9}{}",
            option.method.id.as_i64(),
            option.method.name, option.price, tiered
        );
        if let Some(eta) = &option.method.estimated_delivery {
            info!("        {eta}");
        }
    }
    Ok(())
}

/// List active coupons.
pub async fn coupons(storefront: &Storefront) -> Result<()> {
    let coupons = storefront.coupons().list_active_coupons().await?;
    if coupons.is_empty() {
        info!("No coupons on offer");
    }
    for coupon in &coupons {
        let minimum = if coupon.min_purchase.is_zero() {
            String::new()
        } else {
            format!(", min. {}", coupon.min_purchase)
        };
        info!(
            "  {:<16} {}{}{}",
            coupon.code.as_str(),
            coupon.discount,
            minimum,
            if coupon.free_shipping { ", free shipping" } else { "" }
        );
    }
    Ok(())
}

pub async fn checkout(storefront: &Storefront, action: CheckoutAction) -> Result<()> {
    let mut session = storefront.checkout();
    let currency = storefront.config().currency;

    match action {
        CheckoutAction::Totals(selection) => {
            let outcome = prepare(&mut session, selection).await?;
            if let Some(outcome) = &outcome {
                report_coupon(outcome);
            }
            let breakdown = session.totals();
            print_totals(&breakdown, currency);
        }
        CheckoutAction::Submit {
            selection,
            customer,
            payment,
        } => {
            if let Some(outcome) = prepare(&mut session, selection).await? {
                if !outcome.is_applied() {
                    return Err(StorefrontError::BadRequest(outcome.message().to_string()));
                }
                report_coupon(&outcome);
            }
            session.set_customer(customer.into());
            print_totals(&session.totals(), currency);

            let confirmation = session.submit(&payment.into()).await?;
            info!("Order {} placed", confirmation.order_number);
            info!(
                "  Total {}  ({}, {})",
                confirmation.total_amount.display_in(currency),
                confirmation.status,
                confirmation.payment_status
            );
            if let Some(message) = &confirmation.message {
                info!("  {message}");
            }
        }
    }
    Ok(())
}

/// Apply the shipping selection and coupon to `session`.
async fn prepare(
    session: &mut CheckoutSession,
    selection: Selection,
) -> Result<Option<CouponOutcome>> {
    if let Some(id) = selection.shipping {
        session.select_shipping_by_id(id).await?;
    }
    let outcome = match selection.coupon {
        Some(code) => Some(session.apply_coupon(&code).await),
        None => None,
    };
    Ok(outcome)
}

fn report_coupon(outcome: &CouponOutcome) {
    if outcome.is_applied() {
        info!("{}", outcome.message());
    } else {
        warn!("{}", outcome.message());
    }
}

fn print_totals(breakdown: &TotalsBreakdown, currency: CurrencyCode) {
    let totals = &breakdown.totals;
    info!("  Subtotal  {:>12}", totals.subtotal.display_in(currency));
    info!("  Shipping  {:>12}", totals.shipping_cost.display_in(currency));
    if !totals.discount_amount.is_zero() {
        info!(
            "  Discount  {:>12}",
            format!("-{}", totals.discount_amount.display_in(currency))
        );
    }
    info!("  Total     {:>12}", totals.total.display_in(currency));
    if let Some(rejection) = breakdown.rejection() {
        warn!("Coupon removed: {rejection}");
    }
}
