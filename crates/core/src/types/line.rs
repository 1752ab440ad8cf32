//! Cart lines and the quantity rules shared by every cart.
//!
//! A [`CartLine`] is one purchasable unit: a product (optionally a specific
//! variant), a quantity, the price snapshot taken when it was added, and the
//! last known stock. Lines are identified by their [`LineKey`]; a cart never
//! holds two lines with the same key.
//!
//! # Quantity Policy
//!
//! - Quantities stay within `1..=stock`.
//! - Adding an existing key adds quantities, clamped to the newest stock.
//! - Decrementing a quantity-1 line is a no-op. Removal is always explicit.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{ProductId, VariantId};

/// Identity of a line within a cart: product plus optional variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
}

impl LineKey {
    /// Create a key for a product variant.
    #[must_use]
    pub const fn new(product_id: ProductId, variant_id: Option<VariantId>) -> Self {
        Self {
            product_id,
            variant_id,
        }
    }
}

impl From<ProductId> for LineKey {
    fn from(product_id: ProductId) -> Self {
        Self::new(product_id, None)
    }
}

impl From<(ProductId, VariantId)> for LineKey {
    fn from((product_id, variant_id): (ProductId, VariantId)) -> Self {
        Self::new(product_id, Some(variant_id))
    }
}

impl From<(ProductId, Option<VariantId>)> for LineKey {
    fn from((product_id, variant_id): (ProductId, Option<VariantId>)) -> Self {
        Self::new(product_id, variant_id)
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_id {
            Some(variant_id) => write!(f, "{}/{variant_id}", self.product_id),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// A line that cannot be placed in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineError {
    /// Quantity was zero.
    #[error("quantity must be at least 1 (product {0})")]
    ZeroQuantity(LineKey),

    /// Known stock is zero, so no quantity is valid.
    #[error("product {0} is out of stock")]
    OutOfStock(LineKey),
}

/// One purchasable unit in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    /// Selling price when the line was first added. Not refreshed afterwards.
    pub unit_price: Decimal,
    /// Last known available stock.
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Create a line, clamping `quantity` to `stock`.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::ZeroQuantity`] if `quantity` is zero and
    /// [`LineError::OutOfStock`] if `stock` is zero.
    pub fn new(
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: u32,
        unit_price: Decimal,
        stock: u32,
    ) -> Result<Self, LineError> {
        let mut line = Self {
            product_id,
            variant_id,
            quantity,
            unit_price,
            stock,
            title: None,
            added_at: Utc::now(),
        };
        line.validate()?;
        line.clamp_to_stock();
        Ok(line)
    }

    /// Attach a display title snapshot.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The line's identity within a cart.
    #[must_use]
    pub const fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.variant_id)
    }

    /// Check that the line can exist in a cart at all.
    ///
    /// A quantity above stock is not an error here; see [`Self::clamp_to_stock`].
    ///
    /// # Errors
    ///
    /// Returns [`LineError`] for a zero quantity or zero stock.
    pub const fn validate(&self) -> Result<(), LineError> {
        if self.quantity == 0 {
            return Err(LineError::ZeroQuantity(self.key()));
        }
        if self.stock == 0 {
            return Err(LineError::OutOfStock(self.key()));
        }
        Ok(())
    }

    /// Lower the quantity to the known stock if it exceeds it.
    pub fn clamp_to_stock(&mut self) {
        self.quantity = self.quantity.min(self.stock);
    }

    /// Merge another line with the same key into this one.
    ///
    /// Quantities add up and clamp to the incoming stock, which is the newer
    /// snapshot. The original price snapshot is kept.
    pub fn absorb(&mut self, incoming: &Self) {
        debug_assert_eq!(self.key(), incoming.key());
        self.stock = incoming.stock;
        self.quantity = self.quantity.saturating_add(incoming.quantity);
        self.clamp_to_stock();
        if self.title.is_none() {
            self.title.clone_from(&incoming.title);
        }
    }

    /// Add one unit. Returns `false` when already at stock.
    pub const fn increment(&mut self) -> bool {
        if self.quantity < self.stock {
            self.quantity += 1;
            true
        } else {
            false
        }
    }

    /// Remove one unit. Returns `false` when already at 1.
    pub const fn decrement(&mut self) -> bool {
        if self.quantity > 1 {
            self.quantity -= 1;
            true
        } else {
            false
        }
    }

    /// `unit_price * quantity`, saturating at the `Decimal` bounds.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.total()
    }
}

/// Anything that contributes a quantity and a price to a cart.
pub trait CartEntry {
    /// The entry's identity within its cart.
    fn line_key(&self) -> LineKey;

    /// Units of the entry in the cart.
    fn units(&self) -> u32;

    /// Price per unit.
    fn price(&self) -> Decimal;

    /// `price * units`, saturating at the `Decimal` bounds.
    fn total(&self) -> Decimal {
        self.price().saturating_mul(Decimal::from(self.units()))
    }
}

impl CartEntry for CartLine {
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

/// Total units across entries, as shown on a cart badge.
#[must_use]
pub fn item_count<T: CartEntry>(entries: &[T]) -> u32 {
    entries
        .iter()
        .fold(0u32, |acc, entry| acc.saturating_add(entry.units()))
}

/// Sum of line totals, saturating at the `Decimal` bounds.
#[must_use]
pub fn subtotal<T: CartEntry>(entries: &[T]) -> Decimal {
    entries
        .iter()
        .fold(Decimal::ZERO, |acc, entry| acc.saturating_add(entry.total()))
}
