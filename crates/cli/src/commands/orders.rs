//! Checkout and order history.

use duka_client::Storefront;
use duka_core::OrderId;

use super::{CliError, print_order};

/// Place an order for the cart contents.
pub async fn checkout(shop: &Storefront, address: &str, phone: &str) -> Result<(), CliError> {
    let navigation = shop.navigate("/checkout");
    if !navigation.decision.is_allowed() {
        println!("Sign in first ({}).", navigation.destination());
        return Ok(());
    }

    let order = shop.place_order(address, phone).await?;
    println!("Order placed.");
    print_order(&order);
    println!("Pay with: duka pay {} --phone {phone}", order.id);
    Ok(())
}

pub async fn list(shop: &Storefront) -> Result<(), CliError> {
    let orders = shop.api().list_orders().await?;
    if orders.is_empty() {
        println!("No orders yet.");
    }
    for order in &orders {
        print_order(order);
    }
    Ok(())
}

pub async fn show(shop: &Storefront, id: OrderId) -> Result<(), CliError> {
    let order = shop.api().get_order(id).await?;
    print_order(&order);
    if !order.shipping_address.is_empty() {
        println!("ship to: {}", order.shipping_address);
    }
    for item in &order.items {
        let name = item
            .product
            .as_ref()
            .map_or_else(|| item.product_id.to_string(), |p| p.name.clone());
        println!(
            "  {:>3} x {:<32} @ {}",
            item.quantity, name, item.unit_price
        );
    }
    Ok(())
}
