//! Guest cart file commands.
//!
//! # Usage
//!
//! ```bash
//! cart-cli guest add 12 -q 2 --price 19.99 --stock 10
//! cart-cli guest inc 12
//! cart-cli guest dec 12/5
//! cart-cli guest remove 12
//! ```
//!
//! # Environment Variables
//!
//! - `GUEST_CART_PATH` - JSON file holding the guest cart

use rust_decimal::Decimal;
use storefront_cart::{ActiveCart, CartConfig, CartError, GuestCartStore, JsonFileStorage};
use storefront_cart_core::{CartLine, LineKey, ProductId, VariantId};

use super::{CommandError, print_cart};

fn open(config: &CartConfig) -> GuestCartStore {
    GuestCartStore::open(JsonFileStorage::new(&config.guest_cart_path))
}

/// Print the guest cart.
pub fn show(config: &CartConfig) {
    print_cart(ActiveCart::Guest(&open(config)));
}

/// Add a line to the guest cart.
pub fn add(
    config: &CartConfig,
    product: ProductId,
    variant: Option<VariantId>,
    quantity: u32,
    price: Decimal,
    stock: u32,
    title: Option<String>,
) -> Result<(), CommandError> {
    let mut store = open(config);

    let mut line =
        CartLine::new(product, variant, quantity, price, stock).map_err(CartError::from)?;
    if let Some(title) = title {
        line = line.with_title(title);
    }

    let quantity = store.add_item(line)?;
    tracing::info!(product = %product, quantity, "Guest cart line added");
    print_cart(ActiveCart::Guest(&store));
    Ok(())
}

/// Add one unit to a guest line.
pub fn increment(config: &CartConfig, line: LineKey) -> Result<(), CommandError> {
    let mut store = open(config);
    if !store.increment_quantity(line)? {
        tracing::warn!(%line, "Line missing or already at known stock");
    }
    print_cart(ActiveCart::Guest(&store));
    Ok(())
}

/// Remove one unit from a guest line.
pub fn decrement(config: &CartConfig, line: LineKey) -> Result<(), CommandError> {
    let mut store = open(config);
    if !store.decrement_quantity(line)? {
        tracing::warn!(%line, "Line missing or already at quantity 1");
    }
    print_cart(ActiveCart::Guest(&store));
    Ok(())
}

/// Remove a guest line.
pub fn remove(config: &CartConfig, line: LineKey) -> Result<(), CommandError> {
    let mut store = open(config);
    if !store.remove_item(line)? {
        tracing::warn!(%line, "Line not in guest cart");
    }
    print_cart(ActiveCart::Guest(&store));
    Ok(())
}

/// Empty the guest cart.
pub fn clear(config: &CartConfig) -> Result<(), CommandError> {
    let mut store = open(config);
    store.clear_cart()?;
    tracing::info!("Guest cart cleared");
    Ok(())
}
