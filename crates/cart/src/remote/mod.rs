//! Remote cart API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP with `reqwest`
//! - The remote API is source of truth for prices, stock, and coupons
//! - Nothing is cached: carts are mutable state
//! - Every response is passed through [`normalize_cart`]
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |---|---|
//! | Fetch | `GET cart` |
//! | Add | `POST cart/items` `{productId, variantId?, quantity}` |
//! | Increment / decrement | `PATCH cart/items/{id}` `{action}` |
//! | Remove | `DELETE cart/items/{id}` |
//! | Clear | `DELETE cart` |
//!
//! Paths are resolved against the configured base URL.

mod conversions;
mod types;

pub use conversions::{Normalized, error_message, normalize_cart};
pub use types::{CartItemInput, QuantityAction};

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use storefront_cart_core::{CartItemId, CartSnapshot};

use crate::config::CartApiConfig;
use crate::error::{CartError, Result};
use types::QuantityUpdate;

/// Header carrying a per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

const BODY_LOG_LIMIT: usize = 500;

// =============================================================================
// CartApiClient
// =============================================================================

/// Client for the remote cart API.
///
/// Cheap to clone. [`Self::with_token`] derives a client for one customer
/// that shares the underlying connection pool.
#[derive(Clone)]
pub struct CartApiClient {
    inner: Arc<CartApiClientInner>,
}

struct CartApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl std::fmt::Debug for CartApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.inner.token.is_some())
            .finish()
    }
}

impl CartApiClient {
    /// Create a new cart API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CartApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            inner: Arc::new(CartApiClientInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
            }),
        })
    }

    /// A client that authenticates as the customer owning `token`.
    #[must_use]
    pub fn with_token(&self, token: SecretString) -> Self {
        Self {
            inner: Arc::new(CartApiClientInner {
                client: self.inner.client.clone(),
                base_url: self.inner.base_url.clone(),
                token: Some(token),
            }),
        }
    }

    /// Whether requests carry a bearer token.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.token.is_some()
    }

    /// The base URL endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Execute a cart request and normalize the response.
    ///
    /// Returns `Ok(None)` for a successful response with an empty body.
    #[instrument(skip(self, body), fields(request_id))]
    async fn execute<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<CartSnapshot>> {
        let url = self.inner.base_url.join(path)?;
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CartError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            debug!(
                status = %status,
                body = %truncate(&response_text),
                "Cart API returned non-success status"
            );
            return Err(classify_status(status, &response_text));
        }

        if response_text.trim().is_empty() {
            debug!(status = %status, "Cart API returned empty body");
            return Ok(None);
        }

        let value: serde_json::Value = match serde_json::from_str(&response_text) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %truncate(&response_text),
                    "Failed to parse cart API response"
                );
                return Err(CartError::Parse(e));
            }
        };

        match normalize_cart(&value) {
            Normalized::Ok(snapshot) => {
                debug!(items = snapshot.items.len(), "Cart response normalized");
                Ok(Some(snapshot))
            }
            Normalized::Malformed(reason) => {
                tracing::error!(
                    reason = %reason,
                    body = %truncate(&response_text),
                    "Cart API response did not describe a cart"
                );
                Err(CartError::Malformed(reason))
            }
        }
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the authoritative cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a cart.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<CartSnapshot> {
        self.execute::<()>(Method::GET, "cart", None)
            .await?
            .ok_or_else(|| CartError::Malformed("empty cart response".to_string()))
    }

    /// Add a line (the server merges with an existing line of the same key).
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Validation`] if the server rejects the line, or a
    /// network error.
    #[instrument(skip(self), fields(product_id = %input.product_id, quantity = input.quantity))]
    pub async fn add_item(&self, input: &CartItemInput) -> Result<Option<CartSnapshot>> {
        self.execute(Method::POST, "cart/items", Some(input)).await
    }

    /// Change an item's quantity by one unit.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] for a stale item ID, or a network error.
    #[instrument(skip(self), fields(cart_item_id = %cart_item_id))]
    pub async fn update_quantity(
        &self,
        cart_item_id: CartItemId,
        action: QuantityAction,
    ) -> Result<Option<CartSnapshot>> {
        let path = format!("cart/items/{cart_item_id}");
        self.execute(Method::PATCH, &path, Some(&QuantityUpdate { action }))
            .await
    }

    /// Remove an item. An item that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason other than 404.
    #[instrument(skip(self), fields(cart_item_id = %cart_item_id))]
    pub async fn remove_item(&self, cart_item_id: CartItemId) -> Result<Option<CartSnapshot>> {
        let path = format!("cart/items/{cart_item_id}");
        match self.execute::<()>(Method::DELETE, &path, None).await {
            Err(CartError::NotFound(_)) => {
                debug!("Cart item already absent");
                Ok(None)
            }
            other => other,
        }
    }

    /// Remove every item. A cart that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason other than 404.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<Option<CartSnapshot>> {
        match self.execute::<()>(Method::DELETE, "cart", None).await {
            Err(CartError::NotFound(_)) => {
                debug!("Cart already absent");
                Ok(None)
            }
            other => other,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Map a non-success status to the cart error taxonomy.
fn classify_status(status: StatusCode, body: &str) -> CartError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    match status {
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            CartError::Validation(message)
        }
        StatusCode::NOT_FOUND => CartError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CartError::Unauthorized(message),
        _ => CartError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(BODY_LOG_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        let err = classify_status(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message": "Only 3 left"}"#);
        assert!(matches!(err, CartError::Validation(ref m) if m == "Only 3 left"));

        let err = classify_status(StatusCode::CONFLICT, "");
        assert!(matches!(err, CartError::Validation(ref m) if m == "Conflict"));

        let err = classify_status(StatusCode::NOT_FOUND, "");
        assert!(matches!(err, CartError::NotFound(_)));

        let err = classify_status(StatusCode::FORBIDDEN, "");
        assert!(matches!(err, CartError::Unauthorized(_)));

        let err = classify_status(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(matches!(err, CartError::Status { status: 502, .. }));
    }

    #[test]
    fn test_truncate_limits_length() {
        let long = "x".repeat(2000);
        assert_eq!(truncate(&long).len(), BODY_LOG_LIMIT);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_with_token_shares_base_url() {
        let config = CartApiConfig::new(Url::parse("https://api.example.com/v1").unwrap());
        let client = CartApiClient::new(&config).unwrap();
        assert!(!client.is_authenticated());

        let authed = client.with_token(SecretString::from("tok".to_string()));
        assert!(authed.is_authenticated());
        assert_eq!(authed.base_url().as_str(), "https://api.example.com/v1/");
        assert!(!format!("{authed:?}").contains("tok\""));
    }
}
