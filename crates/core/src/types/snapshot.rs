//! Server cart snapshots.
//!
//! A [`CartSnapshot`] is the authoritative state of a logged-in user's cart
//! as last reported by the remote API. Items carry a server-assigned
//! [`CartItemId`] that is distinct from the product ID.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartId, CartItemId, ProductId, VariantId};
use super::line::{self, CartEntry, LineKey};

/// A line item in a server cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl CartItem {
    /// The item's identity by product and variant.
    #[must_use]
    pub const fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.variant_id)
    }
}

impl CartEntry for CartItem {
    fn line_key(&self) -> LineKey {
        self.key()
    }

    fn units(&self) -> u32 {
        self.quantity
    }

    fn price(&self) -> Decimal {
        self.unit_price
    }
}

/// Authoritative cart state from the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItem>,
}

impl CartSnapshot {
    /// An empty cart with no server ID yet.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cart_id: None,
            items: Vec::new(),
        }
    }

    /// Look up an item by its server-assigned ID.
    #[must_use]
    pub fn item(&self, cart_item_id: CartItemId) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|item| item.cart_item_id == cart_item_id)
    }

    /// Look up an item by product and variant.
    #[must_use]
    pub fn find(&self, key: LineKey) -> Option<&CartItem> {
        self.items.iter().find(|item| item.key() == key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units in the cart.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        line::item_count(&self.items)
    }

    /// Sum of item totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        line::subtotal(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, product: i64, quantity: u32) -> CartItem {
        CartItem {
            cart_item_id: CartItemId::new(id),
            product_id: ProductId::new(product),
            variant_id: None,
            quantity,
            unit_price: Decimal::new(1000, 2),
            stock: 10,
            title: None,
        }
    }

    #[test]
    fn test_lookup_by_item_id_and_key() {
        let snapshot = CartSnapshot {
            cart_id: Some(CartId::new(1)),
            items: vec![item(100, 1, 2), item(101, 2, 1)],
        };

        assert_eq!(
            snapshot.item(CartItemId::new(101)).map(|i| i.product_id),
            Some(ProductId::new(2))
        );
        assert!(snapshot.item(CartItemId::new(999)).is_none());
        assert_eq!(
            snapshot
                .find(LineKey::from(ProductId::new(1)))
                .map(|i| i.cart_item_id),
            Some(CartItemId::new(100))
        );
    }

    #[test]
    fn test_totals() {
        let snapshot = CartSnapshot {
            cart_id: None,
            items: vec![item(100, 1, 2), item(101, 2, 1)],
        };
        assert_eq!(snapshot.item_count(), 3);
        assert_eq!(snapshot.subtotal(), Decimal::new(3000, 2));
        assert_eq!(CartSnapshot::empty().item_count(), 0);
        assert!(CartSnapshot::default().is_empty());
    }
}
