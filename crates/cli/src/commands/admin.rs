//! Admin panel commands.
//!
//! Every command first runs the navigation guard for the matching admin
//! page, so signed-out users and customers are turned away locally before
//! the backend is asked.

use std::path::PathBuf;

use duka_client::Storefront;
use duka_client::api::{ImageUpload, ProductForm, ProductUpdate, UserUpdate};
use duka_core::{Money, OrderId, OrderStatus, ProductId, Role, UserId};

use super::{CliError, print_order, print_product};

/// Fields for a new product.
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub category: String,
    pub image: Option<PathBuf>,
}

/// Fields to change on an existing product.
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub image: Option<PathBuf>,
}

pub async fn orders(shop: &Storefront) -> Result<(), CliError> {
    ensure_admin(shop, "/admin/orders")?;
    let orders = shop.api().list_all_orders().await?;
    for order in &orders {
        print_order(order);
        if !order.user_name.is_empty() {
            println!("    customer: {}", order.user_name);
        }
    }
    println!("-- {} order(s)", orders.len());
    Ok(())
}

pub async fn set_status(
    shop: &Storefront,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), CliError> {
    ensure_admin(shop, "/admin/orders")?;
    shop.api().update_order_status(id, status).await?;
    println!("Order {id} is now {status}.");
    Ok(())
}

pub async fn create_product(shop: &Storefront, new: NewProduct) -> Result<(), CliError> {
    ensure_admin(shop, "/admin/products")?;
    let image = match &new.image {
        Some(path) => Some(ImageUpload::from_path(path).await?),
        None => None,
    };
    let product = shop
        .api()
        .create_product(ProductForm {
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            category: new.category,
            image,
        })
        .await?;
    println!("Created:");
    print_product(&product);
    Ok(())
}

pub async fn update_product(
    shop: &Storefront,
    id: ProductId,
    changes: ProductChanges,
) -> Result<(), CliError> {
    ensure_admin(shop, "/admin/products")?;
    let image = match &changes.image {
        Some(path) => Some(ImageUpload::from_path(path).await?),
        None => None,
    };
    let product = shop
        .api()
        .update_product(
            id,
            ProductUpdate {
                name: changes.name,
                description: changes.description,
                price: changes.price,
                stock: changes.stock,
                category: changes.category,
                image,
            },
        )
        .await?;
    println!("Updated:");
    print_product(&product);
    Ok(())
}

pub async fn delete_product(shop: &Storefront, id: ProductId) -> Result<(), CliError> {
    ensure_admin(shop, "/admin/products")?;
    shop.api().delete_product(id).await?;
    println!("Deleted product {id}.");
    Ok(())
}

pub async fn users(shop: &Storefront) -> Result<(), CliError> {
    ensure_admin(shop, "/admin/dashboard")?;
    for user in shop.api().list_users().await? {
        println!(
            "{}  {:<8} {:<32} {}",
            user.id,
            user.role.as_str(),
            user.email.as_str(),
            user.full_name
        );
    }
    Ok(())
}

pub async fn user(shop: &Storefront, id: UserId) -> Result<(), CliError> {
    ensure_admin(shop, "/admin/dashboard")?;
    let user = shop.api().get_user(id).await?;
    println!("{} <{}>", user.full_name, user.email);
    println!("role:    {}", user.role);
    println!("joined:  {}", user.created_at.format("%Y-%m-%d"));
    Ok(())
}

pub async fn set_role(shop: &Storefront, id: UserId, role: Role) -> Result<(), CliError> {
    ensure_admin(shop, "/admin/dashboard")?;
    let update = UserUpdate {
        role: Some(role),
        ..UserUpdate::default()
    };
    let user = shop.api().update_user(id, &update).await?;
    println!("{} is now {}.", user.full_name, user.role);
    Ok(())
}

pub async fn delete_user(shop: &Storefront, id: UserId) -> Result<(), CliError> {
    ensure_admin(shop, "/admin/dashboard")?;
    shop.api().delete_user(id).await?;
    println!("Disabled account {id}.");
    Ok(())
}

fn ensure_admin(shop: &Storefront, page: &str) -> Result<(), CliError> {
    let navigation = shop.navigate(page);
    if navigation.decision.is_allowed() {
        Ok(())
    } else {
        Err(CliError::Rejected(format!(
            "admin access required (redirected to {})",
            navigation.destination()
        )))
    }
}
