//! REST gateway behavior against a live HTTP backend.
//!
//! Covers error normalization, the bearer header and transport failures.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use duka_client::Storefront;
use duka_client::api::{ApiClient, ApiError, FALLBACK_MESSAGE, LoginRequest, ProductQuery};
use duka_client::config::ApiConfig;
use duka_client::session::TokenHandle;
use duka_client::storage::MemoryStore;
use duka_core::{Email, ProductId, Role};
use duka_integration_tests::{FakeBackend, PASSWORD, unreachable_base_url};

fn client_for(backend: &FakeBackend) -> ApiClient {
    ApiClient::new(&backend.api_config(), TokenHandle::new()).unwrap()
}

#[tokio::test]
async fn test_error_field_becomes_message() {
    let backend = FakeBackend::start().await;
    let api = client_for(&backend);

    let err = api.get_product(ProductId::random()).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.message(), "Product not found");
}

#[tokio::test]
async fn test_plain_text_failure_falls_back_to_status_description() {
    let backend = FakeBackend::start().await;
    backend.fail_health(StatusCode::BAD_GATEWAY, "<html>upstream down</html>");
    let api = client_for(&backend);

    let err = api.health().await.unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(err.message(), "request failed with status code 502");
}

#[tokio::test]
async fn test_blank_error_field_falls_back_to_status_description() {
    let backend = FakeBackend::start().await;
    backend.fail_health(StatusCode::SERVICE_UNAVAILABLE, r#"{"error": "   "}"#);
    let api = client_for(&backend);

    let err = api.health().await.unwrap_err();

    assert_eq!(err.message(), "request failed with status code 503");
}

#[tokio::test]
async fn test_transport_failure_has_message_but_no_status() {
    let config = ApiConfig::parse(&unreachable_base_url().await, "2").unwrap();
    let api = ApiClient::new(&config, TokenHandle::new()).unwrap();

    let err = api.health().await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.status(), None);
    assert!(!err.message().is_empty());
    assert_ne!(err.message(), FALLBACK_MESSAGE);
}

#[tokio::test]
async fn test_get_product_accepts_created_status() {
    let backend = FakeBackend::start().await;
    let seeded = backend.seed_product("Sukuma wiki", 5_000, 12);
    let api = client_for(&backend);

    let product = api.get_product(seeded.id).await.unwrap();

    assert_eq!(product, seeded);
}

#[tokio::test]
async fn test_requests_keep_api_prefix() {
    let backend = FakeBackend::start().await;
    backend.seed_product("Ugali flour", 18_000, 40);
    let api = client_for(&backend);

    let page = api.list_products(&ProductQuery::default()).await.unwrap();

    assert_eq!(page.products.len(), 1);
    assert!(backend.last_request_to("/products").is_some());
    assert!(api.base_url().as_str().ends_with("/api"));
}

#[tokio::test]
async fn test_bearer_header_follows_session() {
    let backend = FakeBackend::start().await;
    let user = backend.seed_user("amina@duka.co.ke", "Amina Wanjiru", Role::Customer);
    let shop = Storefront::init(
        backend.client_config("unused.json".into()),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    shop.api().list_products(&ProductQuery::default()).await.unwrap();
    let anonymous = backend.last_request_to("/products").unwrap();
    assert_eq!(anonymous.authorization, None);

    shop.session()
        .login(LoginRequest {
            email: Email::parse("amina@duka.co.ke").unwrap(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    shop.api().list_products(&ProductQuery::default()).await.unwrap();
    let signed_in = backend.last_request_to("/products").unwrap();
    assert_eq!(
        signed_in.authorization.as_deref(),
        Some(format!("Bearer token-{}", user.id).as_str())
    );

    shop.session().logout();
    shop.api().list_products(&ProductQuery::default()).await.unwrap();
    let signed_out = backend.last_request_to("/products").unwrap();
    assert_eq!(signed_out.authorization, None);
}

#[tokio::test]
async fn test_empty_order_list_decodes_from_null() {
    let backend = FakeBackend::start().await;
    backend.seed_user("amina@duka.co.ke", "Amina Wanjiru", Role::Customer);
    let shop = Storefront::init(
        backend.client_config("unused.json".into()),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    shop.session()
        .login(LoginRequest {
            email: Email::parse("amina@duka.co.ke").unwrap(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();

    let orders = shop.api().list_orders().await.unwrap();

    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_protected_endpoint_without_token_is_unauthorized() {
    let backend = FakeBackend::start().await;
    let api = client_for(&backend);

    let err = api.list_orders().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.message(), "Authorization header required");
}
