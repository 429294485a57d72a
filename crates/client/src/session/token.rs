//! Shared handle to the session bearer token.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};

/// Cheaply cloneable handle to the current bearer token.
///
/// The session manager is the only writer. The API client holds a clone and
/// reads the token when building each request, so requests always carry the
/// token of the session as it is at send time.
#[derive(Clone, Default)]
pub struct TokenHandle {
    inner: Arc<RwLock<Option<SecretString>>>,
}

impl TokenHandle {
    /// Create an empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current token, if any.
    #[must_use]
    pub fn current(&self) -> Option<SecretString> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .map(|token| SecretString::from(token.expose_secret().to_owned()))
    }

    /// Whether a token is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn replace(&self, token: Option<SecretString>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

impl fmt::Debug for TokenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_present() { "[REDACTED]" } else { "None" };
        f.debug_tuple("TokenHandle").field(&state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let handle = TokenHandle::new();
        let reader = handle.clone();
        assert!(!reader.is_present());

        handle.replace(Some(SecretString::from("jwt-abc")));
        assert!(reader.is_present());
        assert_eq!(
            reader.current().map(|t| t.expose_secret().to_owned()),
            Some("jwt-abc".to_string())
        );

        handle.replace(None);
        assert!(reader.current().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let handle = TokenHandle::new();
        handle.replace(Some(SecretString::from("super-secret-jwt")));
        let debug = format!("{handle:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-jwt"));
    }
}
