//! Integration tests for the storefront cart.
//!
//! Every test stands up a `wiremock::MockServer` playing the remote cart API,
//! so no real network traffic is made.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storefront-cart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `remote_client` - wire format, headers, and status mapping
//! - `cart_service` - authenticated mirror behaviour
//! - `reconcile` - login merge and session transitions
//!
//! This library holds the fixtures those tests share.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::MockServer;

use storefront_cart::{AuthenticatedCartService, CartApiClient, CartApiConfig};
use storefront_cart_core::{CartLine, ProductId};

/// Bearer token the mock customer authenticates with.
pub const TOKEN: &str = "customer-token";

/// Cart API config pointed at `server`.
///
/// # Panics
///
/// Panics if the mock server URI does not parse.
#[must_use]
pub fn api_config(server: &MockServer) -> CartApiConfig {
    let base_url = Url::parse(&server.uri()).expect("mock server URI is a valid URL");
    CartApiConfig::new(base_url).with_timeout(std::time::Duration::from_secs(5))
}

/// Unauthenticated client for `server`.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn anonymous_client(server: &MockServer) -> CartApiClient {
    CartApiClient::new(&api_config(server)).expect("failed to build test CartApiClient")
}

/// Client authenticated as the mock customer.
#[must_use]
pub fn customer_client(server: &MockServer) -> CartApiClient {
    anonymous_client(server).with_token(SecretString::from(TOKEN.to_string()))
}

/// Cart service for the mock customer, with an empty mirror.
#[must_use]
pub fn customer_service(server: &MockServer) -> AuthenticatedCartService {
    AuthenticatedCartService::new(customer_client(server))
}

/// One server cart item. `price` is a decimal string such as `"9.99"`.
#[must_use]
pub fn item_json(id: i64, product_id: i64, quantity: u32, price: &str, stock: u32) -> Value {
    json!({
        "id": id,
        "product_id": product_id,
        "quantity": quantity,
        "unit_price": price,
        "stock": stock,
        "title": format!("Product {product_id}"),
    })
}

/// A cart response in the `data.cart_items` envelope.
#[must_use]
pub fn cart_json(items: &[Value]) -> Value {
    json!({ "data": { "id": 1, "cart_items": items } })
}

/// A guest line priced in cents.
///
/// # Panics
///
/// Panics if `quantity` or `stock` is zero.
#[must_use]
pub fn guest_line(product_id: i64, quantity: u32, price_cents: i64, stock: u32) -> CartLine {
    CartLine::new(
        ProductId::new(product_id),
        None,
        quantity,
        Decimal::new(price_cents, 2),
        stock,
    )
    .expect("fixture line is valid")
}
