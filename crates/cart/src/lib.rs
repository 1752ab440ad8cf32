//! Storefront cart subsystem.
//!
//! - [`guest`]: client-side cart for shoppers who are not logged in,
//!   persisted after every change
//! - [`service`]: server-backed cart for logged-in customers, mirrored in
//!   memory from the remote cart API
//! - [`reconcile`]: one-shot merge of the guest cart into the server cart at
//!   login
//! - [`session`]: owner of whichever cart is active
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use secrecy::SecretString;
//! use storefront_cart::{CartApiClient, CartConfig, CartSession, GuestCartStore, JsonFileStorage};
//!
//! let config = CartConfig::from_env()?;
//! let client = CartApiClient::new(&config.api)?;
//! let mut session = CartSession::guest(GuestCartStore::open(JsonFileStorage::new(
//!     &config.guest_cart_path,
//! )));
//!
//! let report = session
//!     .login(&client, SecretString::from("customer-token".to_string()))
//!     .await?;
//! println!("merged {} lines", report.merged.len());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod guest;
pub mod reconcile;
pub mod remote;
pub mod service;
pub mod session;

pub use config::{CartApiConfig, CartConfig, ConfigError, LogFormat};
pub use error::{CartError, ErrorKind, Result};
pub use guest::{GuestCartStore, JsonFileStorage, MemoryStorage, StorageError};
pub use reconcile::{CartReconciler, LineFailure, MergeReport, ReconcileError, ReconcileState};
pub use remote::{CartApiClient, CartItemInput, QuantityAction};
pub use service::AuthenticatedCartService;
pub use session::{ActiveCart, CartSession, LineView, SessionError};
