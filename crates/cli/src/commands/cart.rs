//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! solsplit cart show
//! solsplit cart add 64f1c2 -q 2
//! solsplit cart set 64f1c2 5
//! solsplit cart inc 64f1c2
//! solsplit cart dec 64f1c2
//! solsplit cart remove 64f1c2
//! solsplit cart clear
//! ```

use solsplit_core::{CartLedger, OrderSummary, ProductId, QuantityOutcome};
use solsplit_storefront::{Storefront, StorefrontError};

use super::CliError;

/// Show cart lines, item count and order summary.
pub fn show(storefront: &Storefront) {
    if storefront.identity().is_none() {
        tracing::info!("Not logged in; the cart is empty");
        return;
    }
    let ledger = storefront.cart().ledger();
    for line in describe(ledger) {
        tracing::info!("{line}");
    }
}

/// Add a catalog product.
pub async fn add(storefront: &mut Storefront, id: &str, quantity: u32) -> Result<(), CliError> {
    storefront.add_to_cart(&ProductId::new(id), quantity).await?;
    show(storefront);
    Ok(())
}

/// Set a line's quantity.
pub async fn set(storefront: &mut Storefront, id: &str, quantity: i64) -> Result<(), CliError> {
    let outcome = storefront.set_quantity(&ProductId::new(id), quantity).await?;
    report_missing(outcome, id)?;
    show(storefront);
    Ok(())
}

/// Raise or lower a line by one unit.
pub async fn step(storefront: &mut Storefront, id: &str, up: bool) -> Result<(), CliError> {
    let product_id = ProductId::new(id);
    let cart = storefront.cart_mut();
    let outcome = if up {
        cart.increment(&product_id).await?
    } else {
        cart.decrement(&product_id).await?
    };
    report_missing(outcome, id)?;
    show(storefront);
    Ok(())
}

/// Remove a line.
pub async fn remove(storefront: &mut Storefront, id: &str) -> Result<(), CliError> {
    storefront.cart_mut().remove(&ProductId::new(id)).await?;
    show(storefront);
    Ok(())
}

/// Empty the cart.
pub async fn clear(storefront: &mut Storefront) -> Result<(), CliError> {
    storefront.cart_mut().clear().await?;
    tracing::info!("Cart cleared");
    Ok(())
}

fn report_missing(outcome: QuantityOutcome, id: &str) -> Result<(), CliError> {
    if outcome == QuantityOutcome::Missing {
        return Err(StorefrontError::NotFound(format!("Cart item {id}")).into());
    }
    Ok(())
}

fn describe(ledger: &CartLedger) -> Vec<String> {
    if ledger.is_empty() {
        return vec!["Your cart is empty".to_string()];
    }

    let mut lines: Vec<String> = ledger
        .lines()
        .iter()
        .map(|line| {
            format!(
                "{}  {} x{}  {} each  ${:.2}",
                line.product.id,
                line.product.product_name,
                line.quantity,
                line.product.price,
                line.line_total()
            )
        })
        .collect();
    lines.push(format!("{} item(s)", ledger.count()));
    lines.push(OrderSummary::for_cart(ledger).to_string());
    lines
}
