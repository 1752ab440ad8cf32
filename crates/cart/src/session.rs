//! Cart session: owner of whichever cart is active.
//!
//! A session starts as a guest with a [`GuestCartStore`]. Logging in builds
//! an [`AuthenticatedCartService`] for the customer's token and runs the
//! [`CartReconciler`] once. Logging out drops the service and returns to an
//! empty guest cart.
//!
//! The session is passed explicitly to whatever renders or mutates the cart.
//! There is no global cart state.

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, instrument, warn};

use storefront_cart_core::{CartEntry, CartItemId, LineKey};

use crate::guest::GuestCartStore;
use crate::reconcile::{CartReconciler, MergeReport, ReconcileError};
use crate::remote::CartApiClient;
use crate::service::AuthenticatedCartService;

/// Errors from session transitions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `login` was called on an authenticated session.
    #[error("session is already authenticated")]
    AlreadyAuthenticated,

    /// Reconciliation could not start.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// One displayable line, whichever cart it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineView {
    pub key: LineKey,
    /// Server item ID; `None` for guest lines.
    pub cart_item_id: Option<CartItemId>,
    pub title: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Read-only view of the active cart.
#[derive(Debug, Clone, Copy)]
pub enum ActiveCart<'a> {
    Guest(&'a GuestCartStore),
    Authenticated(&'a AuthenticatedCartService),
}

impl ActiveCart<'_> {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Total units for the cart badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        match self {
            Self::Guest(store) => store.item_count(),
            Self::Authenticated(service) => service.item_count(),
        }
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        match self {
            Self::Guest(store) => store.subtotal(),
            Self::Authenticated(service) => service.subtotal(),
        }
    }

    /// Lines in display order.
    #[must_use]
    pub fn lines(&self) -> Vec<LineView> {
        match self {
            Self::Guest(store) => store
                .lines()
                .iter()
                .map(|line| LineView {
                    key: line.key(),
                    cart_item_id: None,
                    title: line.title.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    line_total: line.line_total(),
                })
                .collect(),
            Self::Authenticated(service) => service
                .items()
                .into_iter()
                .map(|item| LineView {
                    key: item.key(),
                    cart_item_id: Some(item.cart_item_id),
                    line_total: item.total(),
                    title: item.title,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        }
    }

    /// Last error to show next to the cart, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        match self {
            Self::Guest(_) => None,
            Self::Authenticated(service) => service.error(),
        }
    }
}

/// A shopper's cart session.
#[derive(Debug)]
pub struct CartSession {
    guest: GuestCartStore,
    authenticated: Option<AuthenticatedCartService>,
}

impl CartSession {
    /// Start a guest session.
    #[must_use]
    pub const fn guest(guest: GuestCartStore) -> Self {
        Self {
            guest,
            authenticated: None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated.is_some()
    }

    /// The active cart.
    #[must_use]
    pub fn active(&self) -> ActiveCart<'_> {
        match &self.authenticated {
            Some(service) => ActiveCart::Authenticated(service),
            None => ActiveCart::Guest(&self.guest),
        }
    }

    /// The guest cart, for mutation. `None` once logged in.
    pub fn guest_mut(&mut self) -> Option<&mut GuestCartStore> {
        if self.authenticated.is_some() {
            None
        } else {
            Some(&mut self.guest)
        }
    }

    /// The authenticated cart service. `None` while a guest.
    #[must_use]
    pub const fn authenticated(&self) -> Option<&AuthenticatedCartService> {
        self.authenticated.as_ref()
    }

    /// Switch to the customer's server cart, merging the guest cart into it.
    ///
    /// The returned report lists guest lines the server did not accept; they
    /// are not kept anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyAuthenticated`] if already logged in.
    #[instrument(skip_all)]
    pub async fn login(
        &mut self,
        client: &CartApiClient,
        token: SecretString,
    ) -> Result<MergeReport, SessionError> {
        if self.authenticated.is_some() {
            return Err(SessionError::AlreadyAuthenticated);
        }

        let service = AuthenticatedCartService::new(client.with_token(token));
        let report = CartReconciler::new()
            .reconcile(&mut self.guest, &service)
            .await?;

        self.authenticated = Some(service);
        info!(
            merged = report.merged.len(),
            failed = report.failures.len(),
            "Cart session authenticated"
        );
        Ok(report)
    }

    /// Drop the server cart mirror and return to an empty guest cart.
    ///
    /// Returns `false` if the session was not authenticated.
    #[instrument(skip_all)]
    pub fn logout(&mut self) -> bool {
        if self.authenticated.take().is_none() {
            return false;
        }

        if !self.guest.is_empty()
            && let Err(e) = self.guest.clear_cart()
        {
            warn!(error = %e, "Failed to persist cleared guest cart on logout");
        }

        info!("Cart session logged out");
        true
    }
}
