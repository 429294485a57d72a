use serde::{Deserialize, Serialize};

use duka_core::{Money, ProductId};

use crate::api::Product;

/// One product in the cart.
///
/// Persisted with the field names `id`, `name`, `price`, `image_url`,
/// `stock` and `quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Money,
    #[serde(rename = "image_url", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    /// Product stock when the line was last synced. Upper bound for `quantity`.
    #[serde(rename = "stock")]
    pub stock_snapshot: u32,
    pub quantity: u32,
}

impl CartLine {
    pub(crate) fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            image_ref: product.image_url.clone(),
            stock_snapshot: product.stock,
            quantity,
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    /// Whether one more unit fits under the stock snapshot.
    #[must_use]
    pub const fn can_increment(&self) -> bool {
        self.quantity < self.stock_snapshot
    }

    /// `1 ≤ quantity ≤ stock_snapshot`.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.quantity >= 1 && self.quantity <= self.stock_snapshot
    }
}
