//! Request and response bodies exchanged with the storefront API.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use duka_core::{
    Email, Money, OrderId, OrderItemId, OrderStatus, ProductId, Role, TransactionId,
    TransactionStatus, UserId,
};

use super::ApiError;
use crate::session::Identity;

// =============================================================================
// Auth
// =============================================================================

/// Credentials for `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: Email,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// New account details for `POST /auth/register`.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub email: Email,
    pub password: String,
    pub full_name: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Session issued by login and register.
#[derive(Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: String,
    pub token: String,
    pub user: Identity,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("message", &self.message)
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileResponse {
    pub user: Identity,
}

// =============================================================================
// Products
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit can be ordered.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// One page of `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductPage {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

/// Filters and pagination for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
}

impl ProductQuery {
    /// Append the set parameters to `url` as a query string.
    pub fn apply(&self, url: &mut Url) {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.trim().to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("category", category.trim().to_string()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.amount().to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.amount().to_string()));
        }

        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
    }
}

/// An image file attached to a product upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    /// Read an image from disk, guessing its content type from the extension.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Request` if the file cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Request(format!("cannot read {}: {e}", path.display())))?;

        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

        let content_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            _ => "application/octet-stream",
        };

        Ok(Self {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        })
    }

    fn into_part(self) -> Result<Part, ApiError> {
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)
            .map_err(|e| ApiError::Request(format!("invalid image content type: {e}")))
    }
}

/// Fields for creating a product (`POST /products`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub category: String,
    pub image: Option<ImageUpload>,
}

impl ProductForm {
    pub(crate) fn into_multipart(self) -> Result<Form, ApiError> {
        ProductUpdate {
            name: Some(self.name),
            description: Some(self.description),
            price: Some(self.price),
            stock: Some(self.stock),
            category: Some(self.category),
            image: self.image,
        }
        .into_multipart()
    }
}

/// Partial product update (`PUT /products/{id}`). Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub image: Option<ImageUpload>,
}

impl ProductUpdate {
    /// Whether no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category.is_none()
            && self.image.is_none()
    }

    /// Names of the text fields that will be sent, in form order.
    #[must_use]
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(name) = &self.name {
            fields.push(("name", name.clone()));
        }
        if let Some(description) = &self.description {
            fields.push(("description", description.clone()));
        }
        if let Some(price) = self.price {
            fields.push(("price", price.amount().to_string()));
        }
        if let Some(stock) = self.stock {
            fields.push(("stock", stock.to_string()));
        }
        if let Some(category) = &self.category {
            fields.push(("category", category.clone()));
        }
        fields
    }

    pub(crate) fn into_multipart(self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in self.text_fields() {
            form = form.text(name, value);
        }
        if let Some(image) = self.image {
            form = form.part("image", image.into_part()?);
        }
        Ok(form)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Total number of units across all items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(alias = "price")]
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

/// Checkout payload for `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub shipping_address: String,
    pub phone_number: String,
    pub items: Vec<OrderLineRequest>,
}

/// One requested line of an [`OrderRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderStatusUpdate {
    pub status: OrderStatus,
}

// =============================================================================
// Payments
// =============================================================================

/// M-Pesa STK push request (`POST /mpesa/stkpush`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StkPushRequest {
    pub order_id: OrderId,
    pub phone_number: String,
    pub amount: Money,
}

/// Acknowledgement of an STK push.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StkPushResponse {
    pub transaction_id: TransactionId,
    pub status: TransactionStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub mpesa_ref: Option<String>,
}

/// State of a payment transaction (`GET /mpesa/status/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transaction {
    #[serde(alias = "transaction_id")]
    pub id: TransactionId,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub mpesa_ref: Option<String>,
    pub status: TransactionStatus,
    pub amount: Money,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Admin / misc
// =============================================================================

/// Partial account update (`PUT /admin/users/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Serde helpers
// =============================================================================

/// The backend encodes empty lists as `null`.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Treat `""` (and `null`) as absent.
fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}
