//! REST gateway client for the storefront backend.
//!
//! One method per backend endpoint. Every request carries the current
//! session token as a bearer credential when one exists, and every failure
//! is normalized into [`ApiError`].

mod error;
mod types;

use std::future::Future;
use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use duka_core::{OrderId, OrderStatus, ProductId, TransactionId, UserId};

use crate::config::ApiConfig;
use crate::session::{Identity, TokenHandle};

pub use error::{ApiError, FALLBACK_MESSAGE};
pub use types::{
    AuthResponse, HealthStatus, ImageUpload, LoginRequest, Order, OrderItem, OrderLineRequest,
    OrderRequest, Product, ProductForm, ProductPage, ProductQuery, ProductUpdate,
    RegisterRequest, StkPushRequest, StkPushResponse, Transaction, UserUpdate,
};

use types::{OrderStatusUpdate, ProfileResponse};

/// Authentication endpoints used by the session manager.
///
/// Implemented by [`ApiClient`]; tests substitute a scripted fake.
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `POST /auth/register`
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `GET /auth/profile`
    fn fetch_profile(&self) -> impl Future<Output = Result<Identity, ApiError>> + Send;
}

/// Storefront API client.
///
/// Cheap to clone; clones share the connection pool and token handle.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: TokenHandle,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &self.inner.token)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig, token: TokenHandle) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("duka/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                token,
            }),
        })
    }

    /// The API root all endpoint paths are appended to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response carries no token.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse =
            Self::send(self.request(Method::POST, "/auth/login")?.json(request)).await?;
        validate_session(response)
    }

    /// Create an account. The backend signs the new account in.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response carries no token.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse =
            Self::send(self.request(Method::POST, "/auth/register")?.json(request)).await?;
        validate_session(response)
    }

    /// Fetch the identity behind the current token.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<Identity, ApiError> {
        let response: ProfileResponse =
            Self::send(self.request(Method::GET, "/auth/profile")?).await?;
        Ok(response.user)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// List catalog products.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let mut url = self.endpoint("/products")?;
        query.apply(&mut url);
        Self::send(self.request_url(Method::GET, url)).await
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the product does not exist.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        Self::send(self.request(Method::GET, &format!("/products/{id}"))?).await
    }

    /// Create a product (admin). Sent as multipart form content.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_product(&self, form: ProductForm) -> Result<Product, ApiError> {
        let body = form.into_multipart()?;
        Self::send(self.request(Method::POST, "/products")?.multipart(body)).await
    }

    /// Update a product (admin). Only the fields set in `update` are sent.
    ///
    /// # Errors
    ///
    /// Returns error if the update is empty or the request fails.
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ApiError> {
        if update.is_empty() {
            return Err(ApiError::Request("no fields to update".to_string()));
        }
        let body = update.into_multipart()?;
        Self::send(
            self.request(Method::PUT, &format!("/products/{id}"))?
                .multipart(body),
        )
        .await
    }

    /// Delete a product (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        Self::send_empty(self.request(Method::DELETE, &format!("/products/{id}"))?).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Orders of the signed-in shopper.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        let orders: Option<Vec<Order>> = Self::send(self.request(Method::GET, "/orders")?).await?;
        Ok(orders.unwrap_or_default())
    }

    /// Every order in the shop (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_all_orders(&self) -> Result<Vec<Order>, ApiError> {
        let orders: Option<Vec<Order>> =
            Self::send(self.request(Method::GET, "/admin/orders")?).await?;
        Ok(orders.unwrap_or_default())
    }

    /// Get a single order.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        Self::send(self.request(Method::GET, &format!("/orders/{id}"))?).await
    }

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn create_order(&self, request: &OrderRequest) -> Result<Order, ApiError> {
        Self::send(self.request(Method::POST, "/orders")?.json(request)).await
    }

    /// Move an order to a new status (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        Self::send_empty(
            self.request(Method::PATCH, &format!("/orders/{id}/status"))?
                .json(&OrderStatusUpdate { status }),
        )
        .await
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Start an M-Pesa STK push for an order.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn initiate_stk_push(
        &self,
        request: &StkPushRequest,
    ) -> Result<StkPushResponse, ApiError> {
        Self::send(self.request(Method::POST, "/mpesa/stkpush")?.json(request)).await
    }

    /// Check the state of a payment transaction.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn payment_status(&self, id: TransactionId) -> Result<Transaction, ApiError> {
        Self::send(self.request(Method::GET, &format!("/mpesa/status/{id}"))?).await
    }

    // =========================================================================
    // Admin users
    // =========================================================================

    /// List active accounts (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<Identity>, ApiError> {
        let users: Option<Vec<Identity>> =
            Self::send(self.request(Method::GET, "/admin/users")?).await?;
        Ok(users.unwrap_or_default())
    }

    /// Get one account (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: UserId) -> Result<Identity, ApiError> {
        Self::send(self.request(Method::GET, &format!("/admin/users/{id}"))?).await
    }

    /// Update an account (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<Identity, ApiError> {
        Self::send(
            self.request(Method::PUT, &format!("/admin/users/{id}"))?
                .json(update),
        )
        .await
    }

    /// Disable an account (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> Result<(), ApiError> {
        Self::send_empty(self.request(Method::DELETE, &format!("/admin/users/{id}"))?).await
    }

    // =========================================================================
    // Misc
    // =========================================================================

    /// Backend liveness check.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        Self::send(self.request(Method::GET, "/health")?).await
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Absolute URL of an endpoint path.
    ///
    /// Appends rather than joins so a base path such as `/api` is kept.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!(
            "{}{path}",
            self.inner.base_url.as_str().trim_end_matches('/')
        );
        Url::parse(&raw).map_err(|e| ApiError::Request(format!("invalid URL {raw}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.request_url(method, self.endpoint(path)?))
    }

    fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match self.inner.token.current() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::check(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(builder: RequestBuilder) -> Result<(), ApiError> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "API request failed");
        Err(ApiError::from_response(status, &body))
    }
}

impl AuthApi for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        Self::login(self, request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        Self::register(self, request).await
    }

    async fn fetch_profile(&self) -> Result<Identity, ApiError> {
        Self::fetch_profile(self).await
    }
}

/// Reject session responses without a usable token.
fn validate_session(response: AuthResponse) -> Result<AuthResponse, ApiError> {
    if response.token.trim().is_empty() {
        return Err(ApiError::Decode("response carried no session token".to_string()));
    }
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        let config = ApiConfig::parse(base, "5").unwrap();
        ApiClient::new(&config, TokenHandle::new()).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = client("http://localhost:8082/api");
        assert_eq!(
            api.endpoint("/products").unwrap().as_str(),
            "http://localhost:8082/api/products"
        );

        let trailing = client("http://localhost:8082/api/");
        assert_eq!(
            trailing.endpoint("/auth/login").unwrap().as_str(),
            "http://localhost:8082/api/auth/login"
        );
    }

    #[test]
    fn test_validate_session_rejects_empty_token() {
        let response: AuthResponse = serde_json::from_value(serde_json::json!({
            "token": " ",
            "user": {
                "id": "0b6f3a3e-54a4-4a55-9d3c-3d3f0c1a2b4c",
                "email": "amina@duka.co.ke",
                "full_name": "Amina",
                "role": "customer",
                "created_at": "2025-01-05T09:30:00Z",
                "updated_at": "2025-01-05T09:30:00Z"
            }
        }))
        .unwrap();
        assert!(matches!(
            validate_session(response),
            Err(ApiError::Decode(_))
        ));
    }
}
