//! Guest cart store.
//!
//! The guest cart belongs to a shopper who has not logged in. It never talks
//! to the network: every mutation is applied in memory and immediately
//! written to a [`GuestCartStorage`] backend so the cart survives restarts.
//!
//! If persisting fails the in-memory change is kept and the storage error is
//! returned, so the shopper still sees the cart they just edited.

mod storage;

pub use storage::{
    DOCUMENT_VERSION, GuestCartDocument, GuestCartStorage, JsonFileStorage, MemoryStorage,
    StorageError,
};

use rust_decimal::Decimal;
use tracing::{debug, warn};

use storefront_cart_core::{CartLine, LineKey, line};

use crate::error::Result;

/// Client-side cart for unauthenticated sessions.
pub struct GuestCartStore {
    lines: Vec<CartLine>,
    storage: Box<dyn GuestCartStorage>,
}

impl std::fmt::Debug for GuestCartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestCartStore")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl GuestCartStore {
    /// Open the store, hydrating from `storage`.
    ///
    /// A document that cannot be read is logged and replaced by an empty
    /// cart; a broken file must not block the shopper.
    pub fn open(storage: impl GuestCartStorage + 'static) -> Self {
        let lines = match storage.load() {
            Ok(Some(document)) => normalize_lines(document.lines),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable guest cart");
                Vec::new()
            }
        };

        debug!(lines = lines.len(), "Guest cart hydrated");
        Self {
            lines,
            storage: Box::new(storage),
        }
    }

    /// An empty store backed by memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(MemoryStorage::new())
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Look up a line by key.
    #[must_use]
    pub fn get(&self, key: impl Into<LineKey>) -> Option<&CartLine> {
        let key = key.into();
        self.lines.iter().find(|l| l.key() == key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units, as shown on the cart badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        line::item_count(&self.lines)
    }

    /// Sum of line totals at their price snapshots.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        line::subtotal(&self.lines)
    }

    /// Add a line, merging with an existing line of the same key.
    ///
    /// Returns the resulting quantity of the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Line`](crate::CartError::Line) for a zero
    /// quantity or zero stock (nothing is changed), or
    /// [`CartError::Storage`](crate::CartError::Storage) if persisting fails.
    pub fn add_item(&mut self, mut item: CartLine) -> Result<u32> {
        item.validate()?;
        item.clamp_to_stock();

        let key = item.key();
        let quantity = if let Some(existing) = self.lines.iter_mut().find(|l| l.key() == key) {
            existing.absorb(&item);
            existing.quantity
        } else {
            let quantity = item.quantity;
            self.lines.push(item);
            quantity
        };

        debug!(%key, quantity, "Guest cart line added");
        self.persist()?;
        Ok(quantity)
    }

    /// Add one unit to a line. Returns `false` if the line is missing or
    /// already at its known stock.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`](crate::CartError::Storage) if persisting fails.
    pub fn increment_quantity(&mut self, key: impl Into<LineKey>) -> Result<bool> {
        let key = key.into();
        let changed = self
            .lines
            .iter_mut()
            .find(|l| l.key() == key)
            .is_some_and(CartLine::increment);

        if changed {
            self.persist()?;
        }
        Ok(changed)
    }

    /// Remove one unit from a line. A line at quantity 1 is left unchanged;
    /// use [`Self::remove_item`] to drop it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`](crate::CartError::Storage) if persisting fails.
    pub fn decrement_quantity(&mut self, key: impl Into<LineKey>) -> Result<bool> {
        let key = key.into();
        let changed = self
            .lines
            .iter_mut()
            .find(|l| l.key() == key)
            .is_some_and(CartLine::decrement);

        if changed {
            self.persist()?;
        }
        Ok(changed)
    }

    /// Remove a line. Returns `false` if it was not present.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`](crate::CartError::Storage) if persisting fails.
    pub fn remove_item(&mut self, key: impl Into<LineKey>) -> Result<bool> {
        let key = key.into();
        let before = self.lines.len();
        self.lines.retain(|l| l.key() != key);

        let removed = self.lines.len() != before;
        if removed {
            debug!(%key, "Guest cart line removed");
            self.persist()?;
        }
        Ok(removed)
    }

    /// Replace every line, e.g. when hydrating from another source.
    ///
    /// Invalid lines are dropped, duplicate keys merged, and quantities
    /// clamped to stock.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`](crate::CartError::Storage) if persisting fails.
    pub fn set_cart(&mut self, items: Vec<CartLine>) -> Result<()> {
        self.lines = normalize_lines(items);
        self.persist()
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`](crate::CartError::Storage) if persisting fails.
    pub fn clear_cart(&mut self) -> Result<()> {
        self.lines.clear();
        debug!("Guest cart cleared");
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let document = GuestCartDocument::new(self.lines.clone());
        self.storage.save(&document).map_err(|e| {
            warn!(error = %e, "Failed to persist guest cart");
            e.into()
        })
    }
}

/// Enforce the cart invariants on an arbitrary list of lines.
fn normalize_lines(items: Vec<CartLine>) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = Vec::with_capacity(items.len());

    for mut item in items {
        if let Err(e) = item.validate() {
            debug!(error = %e, "Dropping invalid guest cart line");
            continue;
        }
        item.clamp_to_stock();

        match lines.iter_mut().find(|l| l.key() == item.key()) {
            Some(existing) => existing.absorb(&item),
            None => lines.push(item),
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CartError;
    use storefront_cart_core::{ProductId, VariantId};

    fn line(product: i64, quantity: u32, stock: u32) -> CartLine {
        CartLine::new(ProductId::new(product), None, quantity, Decimal::new(1000, 2), stock)
            .unwrap()
    }

    fn raw_line(product: i64, quantity: u32, stock: u32) -> CartLine {
        let mut l = line(product, 1, 1);
        l.quantity = quantity;
        l.stock = stock;
        l
    }

    /// Storage that refuses every write.
    struct ReadOnlyStorage;

    impl GuestCartStorage for ReadOnlyStorage {
        fn load(&self) -> std::result::Result<Option<GuestCartDocument>, StorageError> {
            Ok(None)
        }

        fn save(&self, _: &GuestCartDocument) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io {
                path: "guest-cart.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[test]
    fn test_repeated_add_merges_into_one_line() {
        let mut store = GuestCartStore::in_memory();
        for qty in [1, 2, 3] {
            store.add_item(line(1, qty, 100)).unwrap();
        }

        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.get(ProductId::new(1)).unwrap().quantity, 6);
    }

    #[test]
    fn test_variants_are_distinct_lines() {
        let mut store = GuestCartStore::in_memory();
        let mut red = line(1, 1, 10);
        red.variant_id = Some(VariantId::new(10));
        let mut blue = line(1, 1, 10);
        blue.variant_id = Some(VariantId::new(11));

        store.add_item(red).unwrap();
        store.add_item(blue).unwrap();
        store.add_item(line(1, 1, 10)).unwrap();

        assert_eq!(store.lines().len(), 3);
        assert!(store.get((ProductId::new(1), VariantId::new(11))).is_some());
    }

    #[test]
    fn test_add_clamps_to_stock() {
        let mut store = GuestCartStore::in_memory();
        store.add_item(line(1, 2, 3)).unwrap();
        assert_eq!(store.add_item(line(1, 5, 3)).unwrap(), 3);
    }

    #[test]
    fn test_add_rejects_zero_quantity() {
        let mut store = GuestCartStore::in_memory();
        let err = store.add_item(raw_line(1, 0, 5)).unwrap_err();
        assert!(matches!(err, CartError::Line(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_decrement_at_one_is_noop() {
        let mut store = GuestCartStore::in_memory();
        store.add_item(line(1, 2, 5)).unwrap();

        assert!(store.decrement_quantity(ProductId::new(1)).unwrap());
        assert!(!store.decrement_quantity(ProductId::new(1)).unwrap());
        assert_eq!(store.get(ProductId::new(1)).unwrap().quantity, 1);
    }

    #[test]
    fn test_increment_respects_stock() {
        let mut store = GuestCartStore::in_memory();
        store.add_item(line(1, 1, 2)).unwrap();

        assert!(store.increment_quantity(ProductId::new(1)).unwrap());
        assert!(!store.increment_quantity(ProductId::new(1)).unwrap());
        assert!(!store.increment_quantity(ProductId::new(99)).unwrap());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = GuestCartStore::in_memory();
        store.add_item(line(1, 1, 5)).unwrap();
        store.add_item(line(2, 1, 5)).unwrap();

        assert!(store.remove_item(ProductId::new(1)).unwrap());
        assert!(!store.remove_item(ProductId::new(1)).unwrap());
        assert_eq!(store.lines().len(), 1);

        store.clear_cart().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_cart_normalizes() {
        let mut store = GuestCartStore::in_memory();
        store
            .set_cart(vec![
                raw_line(1, 2, 10),
                raw_line(2, 0, 10),
                raw_line(1, 3, 10),
                raw_line(3, 9, 4),
                raw_line(4, 1, 0),
            ])
            .unwrap();

        let quantities: Vec<_> = store
            .lines()
            .iter()
            .map(|l| (l.product_id.as_i64(), l.quantity))
            .collect();
        assert_eq!(quantities, vec![(1, 5), (3, 4)]);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let storage = MemoryStorage::new();
        let mut store = GuestCartStore::open(storage.clone());

        store.add_item(line(1, 1, 5)).unwrap();
        assert_eq!(storage.snapshot().unwrap().lines.len(), 1);

        store.increment_quantity(ProductId::new(1)).unwrap();
        assert_eq!(storage.snapshot().unwrap().lines[0].quantity, 2);

        store.clear_cart().unwrap();
        assert!(storage.snapshot().unwrap().lines.is_empty());
    }

    #[test]
    fn test_reopen_hydrates_from_storage() {
        let storage = MemoryStorage::new();
        {
            let mut store = GuestCartStore::open(storage.clone());
            store.add_item(line(7, 2, 5)).unwrap();
        }

        let store = GuestCartStore::open(storage);
        assert_eq!(store.item_count(), 2);
        assert_eq!(store.subtotal(), Decimal::new(2000, 2));
    }

    fn temp_path() -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("storefront-cart-{}", uuid::Uuid::new_v4()))
            .join("guest-cart.json")
    }

    /// Open a store over `contents`, add a line, and return what was written.
    fn open_over(contents: &[u8]) -> (GuestCartStore, GuestCartDocument) {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();

        let mut store = GuestCartStore::open(JsonFileStorage::new(&path));
        assert!(store.is_empty());
        store.add_item(line(3, 1, 5)).unwrap();

        let document = JsonFileStorage::new(&path).load().unwrap().unwrap();
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
        (store, document)
    }

    #[test]
    fn test_corrupt_file_opens_empty_and_is_overwritten() {
        let (store, document) = open_over(b"{not json");

        assert_eq!(store.lines().len(), 1);
        assert_eq!(document.version, DOCUMENT_VERSION);
        assert_eq!(document.lines.len(), 1);
        assert_eq!(document.lines[0].product_id, ProductId::new(3));
    }

    #[test]
    fn test_unsupported_version_opens_empty_and_is_overwritten() {
        let (store, document) = open_over(
            br#"{
                "version": 9,
                "updated_at": "2026-01-01T00:00:00Z",
                "lines": [{"product_id": 1, "quantity": 2, "unit_price": "5.00", "stock": 9}]
            }"#,
        );

        assert!(store.get(ProductId::new(1)).is_none());
        assert_eq!(document.version, DOCUMENT_VERSION);
        assert_eq!(document.lines.len(), 1);
        assert_eq!(document.lines[0].product_id, ProductId::new(3));
    }

    #[test]
    fn test_persist_failure_keeps_memory_state() {
        let mut store = GuestCartStore::open(ReadOnlyStorage);
        let err = store.add_item(line(1, 1, 5)).unwrap_err();

        assert!(matches!(err, CartError::Storage(_)));
        assert_eq!(store.lines().len(), 1);
    }
}
