//! Normalized gateway error.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Message used when no better description of a failure is available.
pub const FALLBACK_MESSAGE: &str = "An error occurred";

/// Errors that can occur when calling the storefront API.
///
/// Whatever went wrong, [`ApiError::message`] yields one human-readable
/// message suitable for showing to the shopper.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message taken from the response body, or a generic description.
        message: String,
    },

    /// The request never produced a response (connection refused, timeout).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    Request(String),
}

/// Error body returned by the backend (`{"error": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl ApiError {
    /// Build an error from a non-success response.
    ///
    /// Prefers the structured `error` field of a JSON body, then falls back to
    /// a generic description of the status code.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("request failed with status code {}", status.as_u16()));

        Self::Status {
            status: status.as_u16(),
            message,
        }
    }

    /// Human-readable message for this error.
    #[must_use]
    pub fn message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// HTTP status code, if the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) | Self::Request(_) => None,
        }
    }

    /// Whether the backend rejected the credentials.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_error_field() {
        let err = ApiError::from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"error": "Invalid email or password"}"#,
        );
        assert_eq!(err.message(), "Invalid email or password");
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_message_falls_back_to_status() {
        let err = ApiError::from_response(StatusCode::NOT_FOUND, "<html>nope</html>");
        assert_eq!(err.message(), "request failed with status code 404");

        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, r#"{"error": "  "}"#);
        assert_eq!(err.message(), "request failed with status code 502");

        let err = ApiError::from_response(StatusCode::CONFLICT, r#"{"message": "dup"}"#);
        assert_eq!(err.message(), "request failed with status code 409");
    }

    #[test]
    fn test_empty_message_uses_fallback() {
        let err = ApiError::Status {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.message(), FALLBACK_MESSAGE);
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_decode_error_display() {
        let err = ApiError::Decode("missing field `token`".to_string());
        assert_eq!(err.message(), "invalid response: missing field `token`");
        assert_eq!(err.status(), None);
    }
}
