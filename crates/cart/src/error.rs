//! Unified cart error handling.
//!
//! Every cart operation returns `Result<T, CartError>`. Errors are classified
//! into a small [`ErrorKind`] taxonomy so callers (and the authenticated
//! service's `error` state) can react without matching on transport details.

use thiserror::Error;

use storefront_cart_core::LineError;

use crate::guest::StorageError;

/// Errors that can occur while reading or mutating a cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status not covered by another variant.
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Endpoint URL could not be built from the configured base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Rate limited by the cart API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Server rejected the request on stock or business rules.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Cart item does not exist (stale `cart_item_id`).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token missing, expired, or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Response body did not describe a cart.
    #[error("Malformed cart response: {0}")]
    Malformed(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Line rejected locally before any request was made.
    #[error("Invalid line: {0}")]
    Line(#[from] LineError),

    /// Guest cart could not be persisted or loaded.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse classification of a [`CartError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request failed or the server returned an unexpected non-2xx status.
    Network,
    /// Server or local rule rejected the line.
    Validation,
    /// Stale cart item.
    NotFound,
    /// Authentication problem.
    Unauthorized,
    /// Unusable response body.
    Malformed,
    /// Local persistence failure.
    Storage,
}

impl CartError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::Url(_) | Self::Status { .. } | Self::RateLimited(_) => {
                ErrorKind::Network
            }
            Self::Validation(_) | Self::Line(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Malformed(_) | Self::Parse(_) => ErrorKind::Malformed,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Message suitable for showing next to the cart.
    ///
    /// Server-provided validation text is passed through; transport and
    /// parsing details are not.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Line(err) => err.to_string(),
            Self::NotFound(_) => "That item is no longer in your cart".to_string(),
            Self::Unauthorized(_) => "Your session has expired, please sign in again".to_string(),
            Self::RateLimited(_) => "Too many requests, please try again shortly".to_string(),
            Self::Http(_) | Self::Url(_) | Self::Status { .. } => {
                "Could not reach the cart service, please try again".to_string()
            }
            Self::Malformed(_) | Self::Parse(_) => {
                "The cart service sent an unexpected response".to_string()
            }
            Self::Storage(_) => "Your cart could not be saved on this device".to_string(),
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_cart_core::{LineKey, ProductId};

    #[test]
    fn test_cart_error_display() {
        let err = CartError::NotFound("cart item 42".to_string());
        assert_eq!(err.to_string(), "Not found: cart item 42");

        let err = CartError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Server returned 502: bad gateway");
    }

    #[test]
    fn test_cart_error_kinds() {
        assert_eq!(CartError::RateLimited(3).kind(), ErrorKind::Network);
        assert_eq!(
            CartError::Validation("only 3 left".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CartError::Line(LineError::ZeroQuantity(LineKey::from(ProductId::new(1)))).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CartError::Malformed("no items".to_string()).kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn test_user_message_passes_validation_text_through() {
        let err = CartError::Validation("Only 3 left in stock".to_string());
        assert_eq!(err.user_message(), "Only 3 left in stock");

        let err = CartError::Status {
            status: 500,
            message: "stack trace here".to_string(),
        };
        assert!(!err.user_message().contains("stack trace"));
    }
}
