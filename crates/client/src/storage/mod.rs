//! Persistent key-value bridge.
//!
//! The session and cart managers persist their state as string blobs under
//! fixed keys. The bridge is a blind string store: it never interprets the
//! values it holds, and each key is written by exactly one manager.
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local map, used by tests and throwaway sessions
//! - [`FileStore`] - single JSON document on disk, written atomically

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use thiserror::Error;

/// Keys owned by the state managers.
pub mod keys {
    /// Bearer token of the current session (session manager).
    pub const TOKEN: &str = "token";

    /// JSON-serialized identity of the current session (session manager).
    pub const USER: &str = "user";

    /// JSON-serialized array of cart lines (cart manager).
    pub const CART: &str = "cart";
}

/// Errors that can occur while reading or writing the store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error on the backing file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store contents could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StorageError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable string-keyed storage.
///
/// Implementations must make a `set` or `remove` durable before returning,
/// so callers can rely on write-through semantics.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}
