//! Cart state manager.
//!
//! Holds the cart lines, enforces `1 ≤ quantity ≤ stock_snapshot` for every
//! line, and writes the whole cart through to the key-value store after each
//! mutation. Observers receive a [`CartSnapshot`] after every change.

mod line;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use duka_core::{Money, ProductId};

use crate::api::{OrderLineRequest, OrderRequest, Product};
use crate::storage::{KeyValueStore, keys};

pub use line::CartLine;

/// Aggregate figures for the cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartSummary {
    /// Sum of all quantities.
    pub item_count: u64,
    /// Number of distinct products.
    pub unique_item_count: usize,
    /// Sum of `unit_price × quantity` over all lines.
    pub total_amount: Money,
    pub is_empty: bool,
}

impl CartSummary {
    fn of(lines: &[CartLine]) -> Self {
        Self {
            item_count: lines.iter().map(|line| u64::from(line.quantity)).sum(),
            unique_item_count: lines.len(),
            total_amount: lines.iter().map(CartLine::subtotal).sum(),
            is_empty: lines.is_empty(),
        }
    }
}

/// Point-in-time view of the cart, published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub summary: CartSummary,
}

/// Owns the shopping cart.
pub struct CartManager {
    store: Arc<dyn KeyValueStore>,
    lines: Mutex<Vec<CartLine>>,
    changes: watch::Sender<CartSnapshot>,
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("lines", &*self.lines())
            .finish_non_exhaustive()
    }
}

impl CartManager {
    /// Create an empty cart backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (changes, _) = watch::channel(CartSnapshot::default());
        Self {
            store,
            lines: Mutex::new(Vec::new()),
            changes,
        }
    }

    /// Load the cart persisted by a previous run.
    ///
    /// A cart that does not parse, or that breaks the quantity or
    /// uniqueness rules, is discarded and replaced by an empty one.
    #[instrument(skip(self))]
    pub fn hydrate(&self) {
        let raw = match self.store.get(keys::CART) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted cart, starting empty");
                None
            }
        };

        let mut lines = self.lines();
        match raw.map(|raw| parse_lines(&raw)) {
            None => lines.clear(),
            Some(Ok(restored)) => {
                debug!(lines = restored.len(), "Cart restored");
                *lines = restored;
            }
            Some(Err(reason)) => {
                warn!(%reason, "Persisted cart is corrupt, resetting");
                lines.clear();
                self.persist(&lines);
            }
        }
        self.publish(&lines);
    }

    /// Add `quantity` units of `product`.
    ///
    /// Succeeds only if the resulting quantity fits within `product.stock`.
    /// On success the line's stock snapshot is updated to `product.stock`.
    pub fn add_item(&self, product: &Product, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }

        let mut lines = self.lines();
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product.id) {
            let Some(proposed) = line.quantity.checked_add(quantity) else {
                return false;
            };
            if proposed > product.stock {
                debug!(product_id = %product.id, proposed, stock = product.stock, "Add exceeds stock");
                return false;
            }
            line.quantity = proposed;
            line.stock_snapshot = product.stock;
        } else {
            if quantity > product.stock {
                debug!(product_id = %product.id, quantity, stock = product.stock, "Add exceeds stock");
                return false;
            }
            lines.push(CartLine::from_product(product, quantity));
        }

        self.commit(&lines);
        true
    }

    /// Remove the line for `product_id`. Missing lines are ignored.
    pub fn remove_item(&self, product_id: ProductId) {
        let mut lines = self.lines();
        lines.retain(|line| line.product_id != product_id);
        self.commit(&lines);
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// Fails if there is no such line or `quantity` exceeds its stock
    /// snapshot.
    pub fn set_quantity(&self, product_id: ProductId, quantity: u32) -> bool {
        let mut lines = self.lines();
        let Some(index) = position(&lines, product_id) else {
            return false;
        };

        if quantity == 0 {
            lines.remove(index);
        } else if let Some(line) = lines.get_mut(index) {
            if quantity > line.stock_snapshot {
                return false;
            }
            line.quantity = quantity;
        }

        self.commit(&lines);
        true
    }

    /// Add one unit, if stock allows.
    pub fn increment(&self, product_id: ProductId) -> bool {
        let mut lines = self.lines();
        let Some(line) = lines
            .iter_mut()
            .find(|l| l.product_id == product_id && l.can_increment())
        else {
            return false;
        };

        line.quantity += 1;
        self.commit(&lines);
        true
    }

    /// Take away one unit. The last unit removes the line.
    pub fn decrement(&self, product_id: ProductId) -> bool {
        let mut lines = self.lines();
        let Some(index) = position(&lines, product_id) else {
            return false;
        };

        match lines.get_mut(index) {
            Some(line) if line.quantity > 1 => line.quantity -= 1,
            _ => {
                lines.remove(index);
            }
        }

        self.commit(&lines);
        true
    }

    /// Empty the cart.
    pub fn clear(&self) {
        let mut lines = self.lines();
        lines.clear();
        self.commit(&lines);
    }

    /// Record the authoritative stock of a product.
    ///
    /// Zero stock removes the line; otherwise the quantity is clamped down
    /// to the new stock. Returns whether a matching line existed.
    pub fn refresh_stock(&self, product_id: ProductId, new_stock: u32) -> bool {
        let mut lines = self.lines();
        let Some(index) = position(&lines, product_id) else {
            return false;
        };

        if new_stock == 0 {
            debug!(%product_id, "Product sold out, removing from cart");
            lines.remove(index);
        } else if let Some(line) = lines.get_mut(index) {
            line.stock_snapshot = new_stock;
            if line.quantity > new_stock {
                debug!(%product_id, from = line.quantity, to = new_stock, "Clamping cart quantity");
                line.quantity = new_stock;
            }
        }

        self.commit(&lines);
        true
    }

    // =========================================================================
    // Derived state
    // =========================================================================

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.summary().item_count
    }

    /// Sum of `unit_price × quantity`.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.summary().total_amount
    }

    /// Number of distinct products.
    #[must_use]
    pub fn unique_count(&self) -> usize {
        self.lines().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }

    /// The line for `product_id`.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<CartLine> {
        self.lines()
            .iter()
            .find(|line| line.product_id == product_id)
            .cloned()
    }

    /// All lines, in insertion order.
    #[must_use]
    pub fn lines_snapshot(&self) -> Vec<CartLine> {
        self.lines().clone()
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::of(&self.lines())
    }

    /// Checkout payload for the current cart. `None` when the cart is empty.
    #[must_use]
    pub fn order_request(
        &self,
        shipping_address: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Option<OrderRequest> {
        let lines = self.lines();
        if lines.is_empty() {
            return None;
        }

        Some(OrderRequest {
            shipping_address: shipping_address.into(),
            phone_number: phone_number.into(),
            items: lines
                .iter()
                .map(|line| OrderLineRequest {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        })
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.changes.borrow().clone()
    }

    /// Receive a new [`CartSnapshot`] after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.changes.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lines(&self) -> MutexGuard<'_, Vec<CartLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write through and notify. Called with the lock held so writes land in
    /// mutation order.
    fn commit(&self, lines: &[CartLine]) {
        self.persist(lines);
        self.publish(lines);
    }

    fn persist(&self, lines: &[CartLine]) {
        let result = serde_json::to_string(lines)
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(keys::CART, &json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist cart");
        }
    }

    fn publish(&self, lines: &[CartLine]) {
        self.changes.send_replace(CartSnapshot {
            lines: lines.to_vec(),
            summary: CartSummary::of(lines),
        });
    }
}

fn position(lines: &[CartLine], product_id: ProductId) -> Option<usize> {
    lines.iter().position(|line| line.product_id == product_id)
}

/// Parse and validate a persisted cart.
fn parse_lines(raw: &str) -> Result<Vec<CartLine>, String> {
    let lines: Vec<CartLine> = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    let mut seen = HashSet::with_capacity(lines.len());
    for line in &lines {
        if !line.is_valid() {
            return Err(format!(
                "line {} has quantity {} with stock {}",
                line.product_id, line.quantity, line.stock_snapshot
            ));
        }
        if !seen.insert(line.product_id) {
            return Err(format!("duplicate line for {}", line.product_id));
        }
    }

    Ok(lines)
}
