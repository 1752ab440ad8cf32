//! Login-time cart reconciliation.
//!
//! When a guest logs in, their guest cart is merged into the server cart:
//!
//! 1. Every guest line is sent as an add request. The server clamps the
//!    resulting quantity against stock.
//! 2. A failing line is recorded and the merge moves on.
//! 3. The server cart is refetched once.
//! 4. The guest cart is cleared whatever happened above.
//!
//! Lines the server refused are therefore dropped. Login is never blocked on
//! a merge problem. Logging out does not merge anything back.
//!
//! ```text
//! Idle -> Merging -> Done
//! ```

use thiserror::Error;
use tracing::{info, instrument, warn};

use storefront_cart_core::{CartSnapshot, LineKey};

use crate::error::CartError;
use crate::guest::GuestCartStore;
use crate::remote::CartItemInput;
use crate::service::AuthenticatedCartService;

/// Reconciler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileState {
    #[default]
    Idle,
    Merging,
    Done,
}

/// Errors from starting a reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A reconciler merges exactly once.
    #[error("cart reconciliation already ran (state: {0:?})")]
    AlreadyRun(ReconcileState),
}

/// A guest line the server did not accept.
#[derive(Debug)]
pub struct LineFailure {
    pub key: LineKey,
    pub quantity: u32,
    pub error: CartError,
}

/// Outcome of a merge.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Keys of guest lines the server accepted.
    pub merged: Vec<LineKey>,
    /// Guest lines the server rejected, in guest cart order.
    pub failures: Vec<LineFailure>,
    /// Set when the final refetch failed; `snapshot` is then the last
    /// mirror the service held.
    pub refetch_error: Option<CartError>,
    /// Set when the cleared guest cart could not be persisted.
    pub guest_clear_error: Option<CartError>,
    /// Server cart after the merge.
    pub snapshot: CartSnapshot,
}

impl MergeReport {
    /// Number of guest lines that were sent.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.merged.len() + self.failures.len()
    }

    /// Every line merged and the final state was confirmed by the server.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.refetch_error.is_none()
    }
}

/// One-shot merge of a guest cart into an authenticated cart.
#[derive(Debug, Default)]
pub struct CartReconciler {
    state: ReconcileState,
}

impl CartReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> ReconcileState {
        self.state
    }

    /// Merge `guest` into `service`, then clear `guest`.
    ///
    /// Per-line failures are collected in the report, never returned.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::AlreadyRun`] if this reconciler has already
    /// started a merge; nothing is touched in that case.
    #[instrument(skip_all, fields(lines = guest.lines().len()))]
    pub async fn reconcile(
        &mut self,
        guest: &mut GuestCartStore,
        service: &AuthenticatedCartService,
    ) -> Result<MergeReport, ReconcileError> {
        if self.state != ReconcileState::Idle {
            return Err(ReconcileError::AlreadyRun(self.state));
        }
        self.state = ReconcileState::Merging;

        let mut report = MergeReport::default();
        let lines = guest.lines().to_vec();

        for line in &lines {
            let key = line.key();
            match service.add_cart_item(CartItemInput::from(line)).await {
                Ok(_) => report.merged.push(key),
                Err(error) => {
                    warn!(%key, quantity = line.quantity, error = %error, "Guest line not merged");
                    report.failures.push(LineFailure {
                        key,
                        quantity: line.quantity,
                        error,
                    });
                }
            }
        }

        report.snapshot = match service.refetch_cart().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(error = %error, "Refetch after merge failed");
                report.refetch_error = Some(error);
                service.snapshot()
            }
        };

        if let Err(error) = guest.clear_cart() {
            warn!(error = %error, "Guest cart cleared in memory but not in storage");
            report.guest_clear_error = Some(error);
        }

        self.state = ReconcileState::Done;
        info!(
            merged = report.merged.len(),
            failed = report.failures.len(),
            items = report.snapshot.items.len(),
            "Guest cart reconciled"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CartApiConfig;
    use crate::remote::CartApiClient;
    use url::Url;

    #[test]
    fn test_report_accounting() {
        let mut report = MergeReport::default();
        assert!(report.is_complete());
        assert_eq!(report.attempted(), 0);

        report.failures.push(LineFailure {
            key: LineKey::from(storefront_cart_core::ProductId::new(1)),
            quantity: 1,
            error: CartError::Validation("sold out".to_string()),
        });
        assert!(!report.is_complete());
        assert_eq!(report.attempted(), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_rejected_without_side_effects() {
        let config = CartApiConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
        let service = AuthenticatedCartService::new(CartApiClient::new(&config).unwrap());
        let mut guest = GuestCartStore::in_memory();

        let mut reconciler = CartReconciler {
            state: ReconcileState::Done,
        };
        let err = reconciler.reconcile(&mut guest, &service).await.unwrap_err();
        assert!(matches!(err, ReconcileError::AlreadyRun(ReconcileState::Done)));
        assert_eq!(reconciler.state(), ReconcileState::Done);
    }
}
