//! Session lifecycle over HTTP with a file-backed store.

#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;

use duka_client::Storefront;
use duka_client::api::{LoginRequest, RegisterRequest};
use duka_client::navigation::Decision;
use duka_client::storage::{FileStore, KeyValueStore, keys};
use duka_core::{Email, Role};
use duka_integration_tests::{FakeBackend, PASSWORD};
use tempfile::TempDir;

fn open_shop(backend: &FakeBackend, state_path: &Path) -> Storefront {
    let store = Arc::new(FileStore::open(state_path).unwrap());
    Storefront::init(backend.client_config(state_path.to_path_buf()), store).unwrap()
}

fn credentials(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Email::parse(email).unwrap(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_login_survives_restart() {
    let backend = FakeBackend::start().await;
    let user = backend.seed_user("amina@duka.co.ke", "Amina Wanjiru", Role::Customer);
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");

    let shop = open_shop(&backend, &state_path);
    shop.session()
        .login(credentials("amina@duka.co.ke", PASSWORD))
        .await
        .unwrap();
    assert!(shop.session().is_authenticated());
    shop.shutdown();

    let restarted = open_shop(&backend, &state_path);
    assert!(restarted.session().is_authenticated());
    assert_eq!(restarted.session().identity().unwrap().id, user.id);
    assert_eq!(restarted.session().display_initials(), "AW");

    // The restored token is used for requests again.
    restarted.session().refresh_identity().await.unwrap();
    let profile = backend.last_request_to("/auth/profile").unwrap();
    assert_eq!(
        profile.authorization,
        Some(format!("Bearer token-{}", user.id))
    );
}

#[tokio::test]
async fn test_wrong_password_reports_backend_message() {
    let backend = FakeBackend::start().await;
    backend.seed_user("amina@duka.co.ke", "Amina Wanjiru", Role::Customer);
    let dir = TempDir::new().unwrap();
    let shop = open_shop(&backend, &dir.path().join("state.json"));

    let err = shop
        .session()
        .login(credentials("amina@duka.co.ke", "hunter2"))
        .await
        .unwrap_err();

    assert_eq!(err.message(), "Invalid email or password");
    assert!(!shop.session().is_authenticated());
    assert!(!shop.session().is_loading());
    assert_eq!(
        shop.session().last_error().as_deref(),
        Some("Invalid email or password")
    );
}

#[tokio::test]
async fn test_register_signs_in_as_customer() {
    let backend = FakeBackend::start().await;
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let shop = open_shop(&backend, &state_path);

    shop.session()
        .register(RegisterRequest {
            email: Email::parse("otieno@duka.co.ke").unwrap(),
            password: PASSWORD.to_string(),
            full_name: "Otieno Ouma".to_string(),
        })
        .await
        .unwrap();

    assert!(shop.session().is_authenticated());
    assert!(shop.session().is_customer());
    assert!(!shop.session().is_admin());

    let store = FileStore::open(&state_path).unwrap();
    assert!(store.get(keys::TOKEN).unwrap().is_some());
    assert!(store.get(keys::USER).unwrap().unwrap().contains("Otieno Ouma"));
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let backend = FakeBackend::start().await;
    backend.seed_user("amina@duka.co.ke", "Amina Wanjiru", Role::Customer);
    let dir = TempDir::new().unwrap();
    let shop = open_shop(&backend, &dir.path().join("state.json"));

    let err = shop
        .session()
        .register(RegisterRequest {
            email: Email::parse("amina@duka.co.ke").unwrap(),
            password: PASSWORD.to_string(),
            full_name: "Amina Again".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(err.message(), "User already exists");
    assert!(!shop.session().is_authenticated());
}

#[tokio::test]
async fn test_revoked_token_logs_out_on_refresh() {
    let backend = FakeBackend::start().await;
    let user = backend.seed_user("amina@duka.co.ke", "Amina Wanjiru", Role::Customer);
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");

    // A session persisted by an earlier run whose token the backend no
    // longer accepts.
    {
        let store = FileStore::open(&state_path).unwrap();
        store.set(keys::TOKEN, "token-revoked").unwrap();
        store
            .set(keys::USER, &serde_json::to_string(&user).unwrap())
            .unwrap();
    }

    let shop = open_shop(&backend, &state_path);
    assert!(shop.session().is_authenticated());

    let err = shop.session().refresh_identity().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!shop.session().is_authenticated());
    let store = FileStore::open(&state_path).unwrap();
    assert_eq!(store.get(keys::TOKEN).unwrap(), None);
    assert_eq!(store.get(keys::USER).unwrap(), None);
}

#[tokio::test]
async fn test_logout_erases_persisted_session() {
    let backend = FakeBackend::start().await;
    backend.seed_user("amina@duka.co.ke", "Amina Wanjiru", Role::Customer);
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let shop = open_shop(&backend, &state_path);
    shop.session()
        .login(credentials("amina@duka.co.ke", PASSWORD))
        .await
        .unwrap();

    shop.session().logout();
    shop.session().logout();

    assert!(!shop.session().is_authenticated());
    assert!(shop.session().identity().is_none());
    let restarted = open_shop(&backend, &state_path);
    assert!(!restarted.session().is_authenticated());
}

#[tokio::test]
async fn test_guards_follow_session_role() {
    let backend = FakeBackend::start().await;
    backend.seed_user("amina@duka.co.ke", "Amina Wanjiru", Role::Customer);
    backend.seed_user("boss@duka.co.ke", "Baraka Mwangi", Role::Admin);
    let dir = TempDir::new().unwrap();
    let shop = open_shop(&backend, &dir.path().join("state.json"));

    let anonymous = shop.navigate("/orders?page=2");
    assert_eq!(
        anonymous.decision,
        Decision::RedirectToLogin {
            return_to: "/orders?page=2".to_string()
        }
    );
    assert_eq!(anonymous.destination(), "/login?redirect=%2Forders%3Fpage%3D2");

    shop.session()
        .login(credentials("amina@duka.co.ke", PASSWORD))
        .await
        .unwrap();
    assert!(shop.navigate("/orders").decision.is_allowed());
    assert_eq!(
        shop.navigate("/admin").decision,
        Decision::RedirectToUnauthorized
    );
    assert_eq!(shop.navigate("/login").decision, Decision::RedirectToHome);

    shop.session().logout();
    shop.session()
        .login(credentials("boss@duka.co.ke", PASSWORD))
        .await
        .unwrap();
    let admin = shop.navigate("/admin");
    assert!(admin.decision.is_allowed());
    assert_eq!(admin.route.name, "admin-dashboard");
    assert_eq!(admin.title(), Some("Admin Dashboard - Duka"));
}
