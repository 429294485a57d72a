//! Catalog commands.

use duka_client::Storefront;
use duka_client::api::ProductQuery;
use duka_core::ProductId;

use super::{CliError, print_product};

pub async fn list(shop: &Storefront, query: &ProductQuery) -> Result<(), CliError> {
    let page = shop.api().list_products(query).await?;
    if page.products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    for product in &page.products {
        print_product(product);
    }
    println!(
        "-- page {} ({} of {} products)",
        page.page,
        page.products.len(),
        page.total
    );
    Ok(())
}

pub async fn show(shop: &Storefront, id: ProductId) -> Result<(), CliError> {
    let product = shop.api().get_product(id).await?;
    print_product(&product);
    if !product.category.is_empty() {
        println!("category: {}", product.category);
    }
    if !product.description.is_empty() {
        println!("{}", product.description);
    }
    if let Some(image) = &product.image_url {
        println!("image: {image}");
    }
    if let Some(line) = shop.cart().line(id) {
        println!("in cart: {}", line.quantity);
    }
    Ok(())
}
