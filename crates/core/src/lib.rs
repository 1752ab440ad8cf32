//! Storefront Cart Core - Shared cart types.
//!
//! This crate provides the cart data model used across the workspace:
//! - `storefront-cart` - Guest store, authenticated cart service, reconciler
//! - `cli` - Command-line tool for inspecting and driving carts
//!
//! # Architecture
//!
//! The core crate contains only types and pure quantity rules - no I/O, no
//! storage access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, cart lines, line keys, and server snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
