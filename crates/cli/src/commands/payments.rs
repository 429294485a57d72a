//! M-Pesa payment commands.

use duka_client::Storefront;
use duka_core::{OrderId, TransactionId};

use super::CliError;

/// Start an STK push for an order.
pub async fn pay(shop: &Storefront, order_id: OrderId, phone: &str) -> Result<(), CliError> {
    let order = shop.api().get_order(order_id).await?;
    let response = shop.pay(&order, phone).await?;

    println!(
        "Payment of {} requested on {phone}: {}",
        order.total_amount, response.status
    );
    if !response.message.is_empty() {
        println!("{}", response.message);
    }
    println!("transaction: {}", response.transaction_id);
    Ok(())
}

pub async fn status(shop: &Storefront, id: TransactionId) -> Result<(), CliError> {
    let tx = shop.api().payment_status(id).await?;
    let settled = if tx.status.is_settled() { "settled" } else { "waiting" };
    println!("{}  {}  {}  ({settled})", tx.id, tx.status, tx.amount);
    if let Some(reference) = &tx.mpesa_ref {
        println!("M-Pesa ref: {reference}");
    }
    Ok(())
}
