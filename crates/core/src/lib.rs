//! Duka Core - Shared domain types.
//!
//! This crate provides the types shared by every Duka component:
//! - `client` - Storefront client library (session, cart, API gateway)
//! - `cli` - Command-line storefront built on the client library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, roles and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
