//! CLI command implementations.

pub mod guest;
pub mod login;
pub mod remote;

use storefront_cart::{ActiveCart, CartError, SessionError};
use storefront_cart_core::{LineKey, ProductId, VariantId};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command acts as a customer but no token is configured.
    #[error("CART_API_TOKEN must be set for this command")]
    MissingToken,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Parse a guest line key written as `product` or `product/variant`.
pub fn parse_line_key(s: &str) -> Result<LineKey, String> {
    let (product, variant) = match s.split_once('/') {
        Some((product, variant)) => (product, Some(variant)),
        None => (s, None),
    };

    let product_id = product
        .parse::<ProductId>()
        .map_err(|e| format!("invalid product ID `{product}`: {e}"))?;
    let variant_id = variant
        .map(|v| {
            v.parse::<VariantId>()
                .map_err(|e| format!("invalid variant ID `{v}`: {e}"))
        })
        .transpose()?;

    Ok(LineKey::from((product_id, variant_id)))
}

/// Print a cart as a table.
#[allow(clippy::print_stdout)]
pub fn print_cart(cart: ActiveCart<'_>) {
    let lines = cart.lines();
    let label = if cart.is_authenticated() {
        "Customer cart"
    } else {
        "Guest cart"
    };

    if lines.is_empty() {
        println!("{label}: empty");
        return;
    }

    println!("{label}:");
    for line in &lines {
        let id = line
            .cart_item_id
            .map_or_else(String::new, |id| format!("#{id} "));
        println!(
            "  {id}{key:<10} {title:<24} {qty:>3} x {price:>8} = {total:>9}",
            key = line.key.to_string(),
            title = line.title.as_deref().unwrap_or("-"),
            qty = line.quantity,
            price = line.unit_price,
            total = line.line_total,
        );
    }
    println!(
        "  {} item(s), subtotal {}",
        cart.item_count(),
        cart.subtotal()
    );

    if let Some(error) = cart.error() {
        println!("  last error: {error}");
    }
}
