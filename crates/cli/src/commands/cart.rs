//! Cart commands.
//!
//! Refused changes (stock limits, missing lines) are reported as errors so
//! the process exits non-zero.

use duka_client::Storefront;
use duka_core::ProductId;

use super::CliError;

pub fn show(shop: &Storefront) {
    let snapshot = shop.cart().snapshot();
    if snapshot.summary.is_empty {
        println!("Your cart is empty.");
        return;
    }

    for line in &snapshot.lines {
        println!(
            "{}  {:<32} {:>3} x {:>14} = {:>14}  (max {})",
            line.product_id,
            line.name,
            line.quantity,
            line.unit_price.to_string(),
            line.subtotal().to_string(),
            line.stock_snapshot,
        );
    }
    println!(
        "-- {} item(s), {} product(s), total {}",
        snapshot.summary.item_count, snapshot.summary.unique_item_count, snapshot.summary.total_amount
    );
}

/// Add a product after fetching its current stock.
pub async fn add(shop: &Storefront, id: ProductId, quantity: u32) -> Result<(), CliError> {
    let product = shop.api().get_product(id).await?;
    if !shop.cart().add_item(&product, quantity) {
        let in_cart = shop.cart().line(id).map_or(0, |line| line.quantity);
        return Err(CliError::Rejected(format!(
            "cannot add {quantity} x {}: {} in stock, {in_cart} already in cart",
            product.name, product.stock
        )));
    }
    println!("Added {quantity} x {}.", product.name);
    show(shop);
    Ok(())
}

pub fn set(shop: &Storefront, id: ProductId, quantity: u32) -> Result<(), CliError> {
    if !shop.cart().set_quantity(id, quantity) {
        return Err(rejected(shop, id, "set quantity"));
    }
    show(shop);
    Ok(())
}

pub fn remove(shop: &Storefront, id: ProductId) {
    shop.cart().remove_item(id);
    show(shop);
}

pub fn increment(shop: &Storefront, id: ProductId) -> Result<(), CliError> {
    if !shop.cart().increment(id) {
        return Err(rejected(shop, id, "add another"));
    }
    show(shop);
    Ok(())
}

pub fn decrement(shop: &Storefront, id: ProductId) -> Result<(), CliError> {
    if !shop.cart().decrement(id) {
        return Err(rejected(shop, id, "remove one"));
    }
    show(shop);
    Ok(())
}

pub fn clear(shop: &Storefront) {
    shop.cart().clear();
    println!("Cart cleared.");
}

/// Re-sync stock limits with the catalog.
pub async fn refresh(shop: &Storefront) -> Result<(), CliError> {
    let checked = shop.refresh_cart_stock().await?;
    println!("Checked {checked} product(s).");
    show(shop);
    Ok(())
}

fn rejected(shop: &Storefront, id: ProductId, action: &str) -> CliError {
    match shop.cart().line(id) {
        Some(line) => CliError::Rejected(format!(
            "cannot {action} for {}: only {} in stock",
            line.name, line.stock_snapshot
        )),
        None => CliError::Rejected(format!("{id} is not in your cart")),
    }
}
