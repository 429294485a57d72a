//! Command implementations.
//!
//! Each command drives the client library through the shared [`Storefront`]
//! and prints its result to stdout.

#![allow(clippy::print_stdout)]

pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod payments;
pub mod products;

use thiserror::Error;

use duka_client::api::{ApiError, Order, Product};
use duka_client::storage::StorageError;
use duka_client::{Storefront, StorefrontError};
use duka_core::EmailError;

/// Errors surfaced to the user.
#[derive(Debug, Error)]
pub enum CliError {
    /// Backend or transport failure.
    #[error("{}", .0.message())]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Local state file could not be opened.
    #[error("State file error: {0}")]
    Storage(#[from] StorageError),

    /// A cart change was refused.
    #[error("{0}")]
    Rejected(String),
}

/// Evaluate the navigation guard for `path`.
pub fn navigate(shop: &Storefront, path: &str) {
    let navigation = shop.navigate(path);
    let route = &navigation.route;

    println!("route:       {}", route.name);
    if let Some(from) = &route.redirected_from {
        println!("redirected:  {from} -> {}", route.full_path);
    }
    for (name, value) in &route.params {
        println!("param:       {name} = {value}");
    }
    if let Some(title) = navigation.title() {
        println!("title:       {title}");
    }
    println!("decision:    {:?}", navigation.decision);
    println!("destination: {}", navigation.destination());
}

/// Backend health check.
pub async fn health(shop: &Storefront) -> Result<(), CliError> {
    let status = shop.api().health().await?;
    println!("{} - {}", status.status, status.message);
    Ok(())
}

fn print_product(product: &Product) {
    let stock = if product.in_stock() {
        format!("{} in stock", product.stock)
    } else {
        "sold out".to_string()
    };
    println!(
        "{}  {:<32} {:>14}  {}",
        product.id, product.name, product.price.to_string(), stock
    );
}

fn print_order(order: &Order) {
    println!(
        "{}  {:<10} {:>14}  {} item(s)  {}",
        order.id,
        order.status.as_str(),
        order.total_amount.to_string(),
        order.item_count(),
        order.created_at.format("%Y-%m-%d %H:%M"),
    );
}
