//! Process-wide storefront context.
//!
//! Owns one gateway client, session, cart and router. Built once at start-up
//! with [`Storefront::init`] and handed to whatever drives the UI.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use duka_core::ProductId;

use crate::api::{ApiClient, ApiError, Order, StkPushRequest, StkPushResponse};
use crate::cart::CartManager;
use crate::config::ClientConfig;
use crate::navigation::{Navigation, Router};
use crate::session::{SessionManager, TokenHandle};
use crate::storage::KeyValueStore;

/// Errors from storefront flows that span several components.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("{}", .0.message())]
    Api(#[from] ApiError),

    #[error("you must be signed in")]
    NotSignedIn,

    #[error("your cart is empty")]
    EmptyCart,
}

/// Shared storefront state. Cheap to clone.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    api: ApiClient,
    session: SessionManager<ApiClient>,
    cart: CartManager,
    router: Router,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api", &self.inner.api)
            .field("session", &self.inner.session)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Build the context and restore persisted session and cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn init(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let token = TokenHandle::new();
        let api = ApiClient::new(&config.api, token.clone())?;
        let session = SessionManager::new(api.clone(), Arc::clone(&store), token);
        let cart = CartManager::new(store);

        session.hydrate();
        cart.hydrate();

        info!(
            base_url = %config.api.base_url,
            authenticated = session.is_authenticated(),
            cart_lines = cart.unique_count(),
            "Storefront initialized"
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                session,
                cart,
                router: Router::default(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager<ApiClient> {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartManager {
        &self.inner.cart
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Guard a navigation against the current session.
    #[must_use]
    pub fn navigate(&self, path: &str) -> Navigation {
        self.router().navigate(path, &self.session().snapshot())
    }

    /// Place an order for the cart contents. The cart is cleared on success.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn`, `EmptyCart`, or the gateway error.
    #[instrument(skip(self, shipping_address, phone_number))]
    pub async fn place_order(
        &self,
        shipping_address: &str,
        phone_number: &str,
    ) -> Result<Order, StorefrontError> {
        if !self.session().is_authenticated() {
            return Err(StorefrontError::NotSignedIn);
        }
        let request = self
            .cart()
            .order_request(shipping_address, phone_number)
            .ok_or(StorefrontError::EmptyCart)?;

        let order = self.api().create_order(&request).await?;
        info!(order_id = %order.id, total = %order.total_amount, "Order placed");
        self.cart().clear();
        Ok(order)
    }

    /// Request an M-Pesa payment for `order`.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` or the gateway error.
    #[instrument(skip(self, order, phone_number), fields(order_id = %order.id))]
    pub async fn pay(
        &self,
        order: &Order,
        phone_number: &str,
    ) -> Result<StkPushResponse, StorefrontError> {
        if !self.session().is_authenticated() {
            return Err(StorefrontError::NotSignedIn);
        }
        let request = StkPushRequest {
            order_id: order.id,
            phone_number: phone_number.to_string(),
            amount: order.total_amount,
        };
        Ok(self.api().initiate_stk_push(&request).await?)
    }

    /// Re-sync every cart line's stock snapshot with the catalog.
    ///
    /// Products the backend no longer knows are treated as sold out. Returns
    /// the number of lines checked.
    ///
    /// # Errors
    ///
    /// Returns the first gateway error other than "not found". Lines synced
    /// before the failure keep their new stock.
    #[instrument(skip(self))]
    pub async fn refresh_cart_stock(&self) -> Result<usize, ApiError> {
        let ids: Vec<ProductId> = self
            .cart()
            .lines_snapshot()
            .iter()
            .map(|line| line.product_id)
            .collect();

        for id in &ids {
            match self.api().get_product(*id).await {
                Ok(product) => {
                    self.cart().refresh_stock(*id, product.stock);
                }
                Err(e) if e.status() == Some(404) => {
                    warn!(product_id = %id, "Product no longer exists, removing from cart");
                    self.cart().refresh_stock(*id, 0);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(ids.len())
    }

    /// Tear down the context.
    pub fn shutdown(self) {
        let summary = self.cart().summary();
        info!(
            authenticated = self.session().is_authenticated(),
            cart_items = summary.item_count,
            "Storefront shut down"
        );
    }
}
