//! Duka storefront client library.
//!
//! Client-side state and plumbing for the Duka shop, consuming the REST API:
//!
//! - [`storage`] - Persistent key-value bridge (memory and file backends)
//! - [`api`] - REST gateway client with normalized errors
//! - [`session`] - Session state manager (identity, token, role predicates)
//! - [`cart`] - Cart state manager with stock-bound quantities
//! - [`navigation`] - Route table and navigation guard
//! - [`storefront`] - Process-wide context tying the above together
//!
//! Session and cart write every change through to the key-value store and
//! publish snapshots over `tokio::sync::watch` channels.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod navigation;
pub mod session;
pub mod storage;
pub mod storefront;
pub mod telemetry;

pub use storefront::{Storefront, StorefrontError};
