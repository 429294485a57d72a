//! Integration tests for Duka.
//!
//! The tests drive the real client library over HTTP against
//! [`FakeBackend`], an in-process axum server that speaks the storefront
//! REST contract: `/api` prefix, bearer-token auth, `{"error": "..."}`
//! bodies on failure.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p duka-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `gateway` - Error normalization, bearer header, transport failures
//! - `session_flow` - Login, refresh, logout and persistence across restarts
//! - `checkout` - Cart to order to M-Pesa payment
//! - `admin` - Product uploads and order management

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Multipart, Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use duka_client::api::{Order, OrderItem, Product};
use duka_client::config::{ApiConfig, ClientConfig, LogFormat};
use duka_client::session::Identity;
use duka_core::{
    Email, Money, OrderId, OrderItemId, OrderStatus, ProductId, Role, TransactionId, UserId,
};

/// Password accepted for every seeded account.
pub const PASSWORD: &str = "correct horse";

/// A request as seen by the fake backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// A multipart product upload as received by the fake backend.
#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub fields: Vec<(String, String)>,
    pub image: Option<(String, String, usize)>,
}

#[derive(Debug, Default)]
struct BackendState {
    users: Vec<Identity>,
    products: Vec<Product>,
    orders: Vec<Order>,
    payments: Vec<Value>,
    uploads: Vec<ReceivedUpload>,
    requests: Vec<RecordedRequest>,
    health_failure: Option<(StatusCode, String)>,
}

type Shared = Arc<Mutex<BackendState>>;

/// In-process storefront backend listening on an ephemeral port.
pub struct FakeBackend {
    base_url: String,
    state: Shared,
}

impl FakeBackend {
    /// Bind to `127.0.0.1:0` and start serving in the background.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::default();

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/profile", get(profile))
            .route("/products", get(list_products).post(create_product))
            .route("/products/{id}", get(get_product))
            .route("/orders", get(list_orders).post(create_order))
            .route("/orders/{id}", get(get_order))
            .route("/orders/{id}/status", patch(update_order_status))
            .route("/admin/orders", get(list_all_orders))
            .route("/mpesa/stkpush", post(stk_push))
            .route("/mpesa/status/{id}", get(payment_status))
            .route("/health", get(health));

        let app = Router::new()
            .nest("/api", api)
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve fake backend") });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }

    /// The API root, including the `/api` prefix.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Gateway settings pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the base URL does not parse.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::parse(&self.base_url, "5").expect("fake backend URL")
    }

    /// Full client settings pointing at this backend.
    #[must_use]
    pub fn client_config(&self, state_path: PathBuf) -> ClientConfig {
        ClientConfig {
            api: self.api_config(),
            state_path,
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
        }
    }

    /// Create an account that can log in with [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    pub fn seed_user(&self, email: &str, full_name: &str, role: Role) -> Identity {
        let now = Utc::now();
        let identity = Identity {
            id: UserId::random(),
            email: Email::parse(email).expect("seed email"),
            full_name: full_name.to_string(),
            role,
            created_at: now,
            updated_at: now,
        };
        self.state().users.push(identity.clone());
        identity
    }

    /// Add an active product to the catalog.
    pub fn seed_product(&self, name: &str, price_cents: i64, stock: u32) -> Product {
        let now = Utc::now();
        let product = Product {
            id: ProductId::random(),
            name: name.to_string(),
            description: format!("{name}, fresh from the market"),
            price: Money::from_cents(price_cents),
            stock,
            category: "groceries".to_string(),
            image_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.state().products.push(product.clone());
        product
    }

    /// Change a product's stock level.
    pub fn set_stock(&self, id: ProductId, stock: u32) {
        if let Some(product) = self.state().products.iter_mut().find(|p| p.id == id) {
            product.stock = stock;
        }
    }

    /// Remove a product from the catalog.
    pub fn remove_product(&self, id: ProductId) {
        self.state().products.retain(|p| p.id != id);
    }

    /// Current stock of a product.
    #[must_use]
    pub fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.state()
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.stock)
    }

    /// Make `/health` answer with `status` and a raw `body`.
    pub fn fail_health(&self, status: StatusCode, body: &str) {
        self.state().health_failure = Some((status, body.to_string()));
    }

    /// Every order placed so far.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.state().orders.clone()
    }

    /// STK push bodies received so far.
    #[must_use]
    pub fn payments(&self) -> Vec<Value> {
        self.state().payments.clone()
    }

    /// Multipart product uploads received so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state().uploads.clone()
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// The most recent request to `path` (without the `/api` prefix).
    #[must_use]
    pub fn last_request_to(&self, path: &str) -> Option<RecordedRequest> {
        let full = format!("/api{path}");
        self.state()
            .requests
            .iter()
            .rev()
            .find(|r| r.path == full)
            .cloned()
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        lock(&self.state)
    }
}

/// A base URL on which nothing is listening.
///
/// # Panics
///
/// Panics if no ephemeral port can be reserved.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("reserve port");
    let addr = listener.local_addr().expect("reserved address");
    drop(listener);
    format!("http://{addr}/api")
}

// =============================================================================
// Plumbing
// =============================================================================

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(String::from),
    };
    lock(&state).requests.push(recorded);
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn token_for(user: &Identity) -> String {
    format!("token-{}", user.id)
}

/// The account behind the bearer token, if any.
fn caller(state: &BackendState, headers: &HeaderMap) -> Option<Identity> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    state
        .users
        .iter()
        .find(|u| token_for(u) == token)
        .cloned()
}

fn session_body(message: &str, user: &Identity) -> Value {
    json!({ "message": message, "token": token_for(user), "user": user })
}

// =============================================================================
// Auth
// =============================================================================

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let state = lock(&state);
    match state.users.iter().find(|u| u.email.as_str() == email) {
        Some(user) if password == PASSWORD => {
            Json(session_body("Login successful", user)).into_response()
        }
        _ => error(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let Ok(email) = Email::parse(body["email"].as_str().unwrap_or_default()) else {
        return error(StatusCode::BAD_REQUEST, "Invalid email");
    };

    let mut state = lock(&state);
    if state.users.iter().any(|u| u.email == email) {
        return error(StatusCode::CONFLICT, "User already exists");
    }

    let now = Utc::now();
    let user = Identity {
        id: UserId::random(),
        email,
        full_name: body["full_name"].as_str().unwrap_or_default().to_string(),
        role: Role::Customer,
        created_at: now,
        updated_at: now,
    };
    state.users.push(user.clone());
    (
        StatusCode::CREATED,
        Json(session_body("User registered successfully", &user)),
    )
        .into_response()
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    match caller(&lock(&state), &headers) {
        Some(user) => Json(json!({ "user": user })).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "Invalid token"),
    }
}

// =============================================================================
// Products
// =============================================================================

async fn list_products(State(state): State<Shared>) -> Response {
    let state = lock(&state);
    let active: Vec<&Product> = state.products.iter().filter(|p| p.is_active).collect();
    Json(json!({
        "products": active,
        "total": active.len(),
        "page": 1,
        "limit": 10,
    }))
    .into_response()
}

async fn get_product(State(state): State<Shared>, Path(id): Path<ProductId>) -> Response {
    match lock(&state).products.iter().find(|p| p.id == id) {
        // The real backend answers a plain read with 201.
        Some(product) => (StatusCode::CREATED, Json(product)).into_response(),
        None => error(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn create_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    match caller(&lock(&state), &headers) {
        Some(user) if user.role.is_admin() => {}
        Some(_) => return error(StatusCode::FORBIDDEN, "Admin access required"),
        None => return error(StatusCode::UNAUTHORIZED, "Authorization header required"),
    }

    let mut upload = ReceivedUpload::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let len = field.bytes().await.map_or(0, |b| b.len());
            upload.image = Some((file_name, content_type, len));
        } else {
            let value = field.text().await.unwrap_or_default();
            upload.fields.push((name, value));
        }
    }

    let field = |key: &str| {
        upload
            .fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    let (Ok(price), Ok(stock)) = (field("price").parse::<Money>(), field("stock").parse::<u32>())
    else {
        return error(StatusCode::BAD_REQUEST, "Invalid price or stock");
    };

    let now = Utc::now();
    let product = Product {
        id: ProductId::random(),
        name: field("name"),
        description: field("description"),
        price,
        stock,
        category: field("category"),
        image_url: upload
            .image
            .as_ref()
            .map(|(file_name, _, _)| format!("/uploads/{file_name}")),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let mut state = lock(&state);
    state.uploads.push(upload);
    state.products.push(product.clone());
    (StatusCode::CREATED, Json(product)).into_response()
}

// =============================================================================
// Orders
// =============================================================================

async fn list_orders(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(user) = caller(&state, &headers) else {
        return error(StatusCode::UNAUTHORIZED, "Authorization header required");
    };
    let mine: Vec<&Order> = state.orders.iter().filter(|o| o.user_id == user.id).collect();
    if mine.is_empty() {
        // The real backend encodes an empty slice as null.
        return Json(Value::Null).into_response();
    }
    Json(mine).into_response()
}

async fn list_all_orders(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    match caller(&state, &headers) {
        Some(user) if user.role.is_admin() => Json(&state.orders).into_response(),
        Some(_) => error(StatusCode::FORBIDDEN, "Admin access required"),
        None => error(StatusCode::UNAUTHORIZED, "Authorization header required"),
    }
}

async fn get_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<OrderId>,
) -> Response {
    let state = lock(&state);
    let Some(user) = caller(&state, &headers) else {
        return error(StatusCode::UNAUTHORIZED, "Authorization header required");
    };
    match state
        .orders
        .iter()
        .find(|o| o.id == id && (o.user_id == user.id || user.role.is_admin()))
    {
        Some(order) => Json(order).into_response(),
        None => error(StatusCode::NOT_FOUND, "Order not found"),
    }
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    let Some(user) = caller(&state, &headers) else {
        return error(StatusCode::UNAUTHORIZED, "Authorization header required");
    };

    let order_id = OrderId::random();
    let mut items = Vec::new();
    let lines = body["items"].as_array().cloned().unwrap_or_default();
    for line in &lines {
        let Ok(product_id) = serde_json::from_value::<ProductId>(line["product_id"].clone()) else {
            return error(StatusCode::BAD_REQUEST, "Invalid product id");
        };
        let quantity = line["quantity"]
            .as_u64()
            .and_then(|q| u32::try_from(q).ok())
            .unwrap_or_default();
        let Some(product) = state.products.iter_mut().find(|p| p.id == product_id) else {
            return error(StatusCode::NOT_FOUND, "Product not found");
        };
        if quantity == 0 || quantity > product.stock {
            return error(
                StatusCode::BAD_REQUEST,
                &format!("Insufficient stock for {}", product.name),
            );
        }
        product.stock -= quantity;
        items.push(OrderItem {
            id: OrderItemId::random(),
            order_id,
            product_id,
            quantity,
            unit_price: product.price,
            product: None,
        });
    }

    let now = Utc::now();
    let order = Order {
        id: order_id,
        user_id: user.id,
        user_name: user.full_name,
        status: OrderStatus::Pending,
        total_amount: items.iter().map(|i| i.unit_price.times(i.quantity)).sum(),
        shipping_address: body["shipping_address"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        phone_number: body["phone_number"].as_str().map(String::from),
        created_at: now,
        updated_at: now,
        items,
    };
    state.orders.push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn update_order_status(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<OrderId>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    match caller(&state, &headers) {
        Some(user) if user.role.is_admin() => {}
        Some(_) => return error(StatusCode::FORBIDDEN, "Admin access required"),
        None => return error(StatusCode::UNAUTHORIZED, "Authorization header required"),
    }
    let Ok(status) = serde_json::from_value::<OrderStatus>(body["status"].clone()) else {
        return error(StatusCode::BAD_REQUEST, "Invalid status");
    };
    match state.orders.iter_mut().find(|o| o.id == id) {
        Some(order) => {
            order.status = status;
            order.updated_at = Utc::now();
            Json(json!({ "message": "Order status updated" })).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Order not found"),
    }
}

// =============================================================================
// Payments
// =============================================================================

async fn stk_push(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if caller(&state, &headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Authorization header required");
    }
    if !body["phone_number"]
        .as_str()
        .is_some_and(|p| p.starts_with("254"))
    {
        return error(StatusCode::BAD_REQUEST, "Invalid phone number");
    }

    let transaction_id = TransactionId::random();
    let mut record = body.clone();
    record["transaction_id"] = json!(transaction_id);
    state.payments.push(record);
    Json(json!({
        "transaction_id": transaction_id,
        "status": "pending",
        "message": "STK push sent. Check your phone.",
    }))
    .into_response()
}

async fn payment_status(State(state): State<Shared>, Path(id): Path<Uuid>) -> Response {
    let state = lock(&state);
    let id = TransactionId::new(id);
    match state
        .payments
        .iter()
        .find(|p| p["transaction_id"] == json!(id))
    {
        Some(payment) => Json(json!({
            "transaction_id": id,
            "order_id": payment["order_id"],
            "mpesa_ref": "QGH7XYZ123",
            "status": "success",
            "amount": payment["amount"],
            "phone_number": payment["phone_number"],
        }))
        .into_response(),
        None => error(StatusCode::NOT_FOUND, "Transaction not found"),
    }
}

// =============================================================================
// Misc
// =============================================================================

async fn health(State(state): State<Shared>) -> Response {
    match lock(&state).health_failure.clone() {
        Some((status, body)) => (status, body).into_response(),
        None => Json(json!({ "status": "ok", "message": "Duka API is running" })).into_response(),
    }
}
