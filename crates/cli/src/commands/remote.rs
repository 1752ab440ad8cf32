//! Customer server cart commands.
//!
//! Every command loads the server cart first, applies its change through
//! the cart service, and prints the cart the server returned.
//!
//! # Environment Variables
//!
//! - `CART_API_BASE_URL` - Base URL of the remote cart API
//! - `CART_API_TOKEN` - Bearer token of the customer

use storefront_cart::{
    ActiveCart, AuthenticatedCartService, CartApiClient, CartConfig, CartItemInput,
};
use storefront_cart_core::{CartItemId, ProductId, VariantId};

use super::{CommandError, print_cart};

/// Build a cart service for the configured customer and load their cart.
pub async fn connect(config: &CartConfig) -> Result<AuthenticatedCartService, CommandError> {
    if config.api.token.is_none() {
        return Err(CommandError::MissingToken);
    }

    let service = AuthenticatedCartService::new(CartApiClient::new(&config.api)?);
    service.refetch_cart().await?;
    Ok(service)
}

/// Print the mirrored server cart.
pub fn show(service: &AuthenticatedCartService) {
    print_cart(ActiveCart::Authenticated(service));
}

/// Add a line to the server cart.
pub async fn add(
    service: &AuthenticatedCartService,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: u32,
) -> Result<(), CommandError> {
    service
        .add_cart_item(CartItemInput {
            product_id,
            variant_id,
            quantity,
        })
        .await?;
    Ok(())
}

/// Add one unit to a cart item.
pub async fn increment(
    service: &AuthenticatedCartService,
    item: CartItemId,
) -> Result<(), CommandError> {
    service.increment_item_quantity(item).await?;
    Ok(())
}

/// Remove one unit from a cart item.
pub async fn decrement(
    service: &AuthenticatedCartService,
    item: CartItemId,
) -> Result<(), CommandError> {
    service.decrement_item_quantity(item).await?;
    Ok(())
}

/// Remove a cart item.
pub async fn remove(
    service: &AuthenticatedCartService,
    item: CartItemId,
) -> Result<(), CommandError> {
    service.remove_cart_item(item).await?;
    Ok(())
}

/// Empty the server cart.
pub async fn clear(service: &AuthenticatedCartService) -> Result<(), CommandError> {
    service.clear_cart().await?;
    Ok(())
}
