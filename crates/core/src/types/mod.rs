//! Core types for Storefront Cart.
//!
//! This module provides type-safe wrappers for cart domain concepts.

pub mod id;
pub mod line;
pub mod snapshot;

pub use id::*;
pub use line::{CartEntry, CartLine, LineError, LineKey, item_count, subtotal};
pub use snapshot::{CartItem, CartSnapshot};
