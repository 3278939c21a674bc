//! Order history and payment account commands.

use clap::Subcommand;
use emporium_core::order::default_account;
use emporium_storefront::Storefront;
use emporium_storefront::error::Result;
use tracing::info;

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List your orders
    List,
    /// Show one order with its items and status history
    Show {
        /// Order number, e.g. `ORD-1042`
        order_number: String,
    },
}

pub async fn orders(storefront: &Storefront, action: OrdersAction) -> Result<()> {
    match action {
        OrdersAction::List => {
            let orders = storefront.api().orders().await?;
            if orders.is_empty() {
                info!("No orders yet");
            }
            for order in &orders {
                info!(
                    "  {:<12} {}  {:>3} item(s) {:>10}  {} / {}",
                    order.order_number,
                    order.ordered_at.format("%Y-%m-%d"),
                    order.unit_count(),
                    order.total_amount,
                    order.status,
                    order.payment_status
                );
            }
        }
        OrdersAction::Show { order_number } => {
            let order = storefront.api().order(&order_number).await?;
            info!(
                "Order {} placed {}",
                order.order_number,
                order.ordered_at.format("%Y-%m-%d %H:%M UTC")
            );
            info!("  Status:   {} ({})", order.status, order.payment_status);
            if let Some(tracking) = &order.tracking_number {
                info!("  Tracking: {tracking}");
            }
            for item in &order.items {
                let variant: Vec<&str> = [item.color.as_deref(), item.size.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                info!(
                    "  {:<28} {:<12} {:>3} x {:>8} = {:>9}",
                    item.product,
                    variant.join("/"),
                    item.quantity,
                    item.unit_price,
                    item.line_total()
                );
            }
            info!("  Total {}", order.total_amount);
            for update in &order.updates {
                info!(
                    "  {}  {}{}",
                    update.timestamp.format("%Y-%m-%d %H:%M"),
                    update.status,
                    update
                        .notes
                        .as_deref()
                        .map(|n| format!(": {n}"))
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

/// Accounts that accept mobile payments. The preselected one is starred.
pub async fn payment_accounts(storefront: &Storefront) -> Result<()> {
    let accounts = storefront.api().payment_accounts().await?;
    let preselected = default_account(&accounts).map(|a| a.id);

    if accounts.is_empty() {
        info!("No payment accounts available");
    }
    for account in accounts.iter().filter(|a| a.is_active) {
        let marker = if Some(account.id) == preselected { "*" } else { " " };
        info!(
            "{marker} {:<8} {:<16} {}",
            account.payment_method.as_str(),
            account.account_number,
            account.account_name.as_deref().unwrap_or_default()
        );
        if let Some(instructions) = &account.instructions {
            info!("           {instructions}");
        }
    }
    Ok(())
}
