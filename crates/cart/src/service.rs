//! Authenticated cart service.
//!
//! Mediates every cart mutation of a logged-in customer through the remote
//! API and keeps an in-memory mirror of the server cart for display.
//!
//! # Sync Policy
//!
//! The mirror is never patched locally. Each successful mutation replaces it
//! with the server's response (or a fresh `GET cart` when the response body
//! is empty), so server-side rules such as stock clamping, tax, and coupon
//! recalculation are always reflected.
//!
//! Mutations are not serialized. Two overlapping calls both reach the
//! server, and whichever response is applied last wins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use tracing::{debug, error, instrument};

use storefront_cart_core::{CartItem, CartItemId, CartSnapshot};

use crate::error::{CartError, Result};
use crate::remote::{CartApiClient, CartItemInput, QuantityAction};

/// Server-backed cart for one logged-in customer.
///
/// Cheap to clone; clones share the same mirror.
#[derive(Clone)]
pub struct AuthenticatedCartService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    client: CartApiClient,
    state: Mutex<MirrorState>,
    in_flight: AtomicUsize,
}

#[derive(Default)]
struct MirrorState {
    snapshot: CartSnapshot,
    error: Option<String>,
}

impl std::fmt::Debug for AuthenticatedCartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("AuthenticatedCartService")
            .field("snapshot", &state.snapshot)
            .field("error", &state.error)
            .field("in_flight", &self.inner.in_flight.load(Ordering::Relaxed))
            .finish()
    }
}

/// Marks one operation as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AuthenticatedCartService {
    /// Create a service with an empty mirror. Call [`Self::refetch_cart`] to
    /// load the server cart.
    #[must_use]
    pub fn new(client: CartApiClient) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                client,
                state: Mutex::new(MirrorState::default()),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MirrorState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Exposed State
    // =========================================================================

    /// Items in the mirror.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.state().snapshot.items.clone()
    }

    /// The whole mirrored cart.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.state().snapshot.clone()
    }

    /// True while any mutation or fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Message from the last failed operation, cleared by the next success.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.state().snapshot.item_count()
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.state().snapshot.subtotal()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Add a line to the server cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Validation`] when the server rejects the line
    /// (e.g. stock exceeded) or a network error.
    #[instrument(skip(self), fields(product_id = %input.product_id))]
    pub async fn add_cart_item(&self, input: CartItemInput) -> Result<CartSnapshot> {
        let _guard = InFlight::enter(&self.inner.in_flight);
        let outcome = self.inner.client.add_item(&input).await;
        self.settle("add", outcome).await
    }

    /// Add one unit to an item.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the item is not in the mirror (no
    /// request is made) or the server no longer has it.
    #[instrument(skip(self), fields(cart_item_id = %cart_item_id))]
    pub async fn increment_item_quantity(&self, cart_item_id: CartItemId) -> Result<CartSnapshot> {
        let _guard = InFlight::enter(&self.inner.in_flight);
        if let Err(e) = self.mirrored_item(cart_item_id) {
            return self.fail("increment", e);
        }

        let outcome = self
            .inner
            .client
            .update_quantity(cart_item_id, QuantityAction::Increment)
            .await;
        self.settle("increment", outcome).await
    }

    /// Remove one unit from an item. An item at quantity 1 is left as is and
    /// no request is made; use [`Self::remove_cart_item`] to drop it. The
    /// no-op still counts as a success and clears the last error.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the item is not in the mirror or the
    /// server no longer has it.
    #[instrument(skip(self), fields(cart_item_id = %cart_item_id))]
    pub async fn decrement_item_quantity(&self, cart_item_id: CartItemId) -> Result<CartSnapshot> {
        let _guard = InFlight::enter(&self.inner.in_flight);
        match self.mirrored_item(cart_item_id) {
            Err(e) => return self.fail("decrement", e),
            Ok(item) if item.quantity <= 1 => {
                debug!("Decrement at quantity 1 ignored");
                self.state().error = None;
                return Ok(self.snapshot());
            }
            Ok(_) => {}
        }

        let outcome = self
            .inner
            .client
            .update_quantity(cart_item_id, QuantityAction::Decrement)
            .await;
        self.settle("decrement", outcome).await
    }

    /// Remove an item. Removing an item that is already gone succeeds.
    ///
    /// # Errors
    ///
    /// Returns a network error if the server cannot be reached.
    #[instrument(skip(self), fields(cart_item_id = %cart_item_id))]
    pub async fn remove_cart_item(&self, cart_item_id: CartItemId) -> Result<CartSnapshot> {
        let _guard = InFlight::enter(&self.inner.in_flight);
        let outcome = self.inner.client.remove_item(cart_item_id).await;
        self.settle("remove", outcome).await
    }

    /// Remove every item.
    ///
    /// # Errors
    ///
    /// Returns a network error if the server cannot be reached.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<CartSnapshot> {
        let _guard = InFlight::enter(&self.inner.in_flight);
        let outcome = self.inner.client.clear_cart().await;
        self.settle("clear", outcome).await
    }

    /// Reload the authoritative cart, discarding the current mirror.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails; the mirror is left unchanged.
    #[instrument(skip(self))]
    pub async fn refetch_cart(&self) -> Result<CartSnapshot> {
        let _guard = InFlight::enter(&self.inner.in_flight);
        let outcome = self.inner.client.get_cart().await.map(Some);
        self.settle("refetch", outcome).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn mirrored_item(&self, cart_item_id: CartItemId) -> Result<CartItem> {
        self.state()
            .snapshot
            .item(cart_item_id)
            .cloned()
            .ok_or_else(|| CartError::NotFound(format!("cart item {cart_item_id}")))
    }

    /// Apply an operation's outcome to the mirror.
    ///
    /// An empty success body is followed by a refetch.
    async fn settle(
        &self,
        operation: &'static str,
        outcome: Result<Option<CartSnapshot>>,
    ) -> Result<CartSnapshot> {
        let outcome = match outcome {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => self.inner.client.get_cart().await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(snapshot) => {
                let mut state = self.state();
                state.snapshot = snapshot.clone();
                state.error = None;
                debug!(
                    operation,
                    items = snapshot.items.len(),
                    "Cart mirror updated"
                );
                Ok(snapshot)
            }
            Err(e) => self.fail(operation, e),
        }
    }

    /// Record a failure in the error state and hand it back to the caller.
    fn fail(&self, operation: &'static str, e: CartError) -> Result<CartSnapshot> {
        error!(operation, error = %e, "Cart operation failed");
        self.state().error = Some(e.user_message());
        Err(e)
    }
}
