//! Durable storage backends for the guest cart.
//!
//! The guest cart is written as a small versioned JSON document:
//!
//! ```json
//! { "version": 1, "updated_at": "2026-01-01T00:00:00Z", "lines": [] }
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_cart_core::CartLine;

/// Current document version.
pub const DOCUMENT_VERSION: u32 = 1;

/// Errors from reading or writing guest cart storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON or has the wrong shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document was written by an incompatible version.
    #[error("unsupported guest cart version {0}")]
    UnsupportedVersion(u32),
}

/// Persisted form of the guest cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCartDocument {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<CartLine>,
}

impl GuestCartDocument {
    /// Wrap lines in a current-version document stamped now.
    #[must_use]
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            updated_at: Utc::now(),
            lines,
        }
    }

    fn check_version(self) -> Result<Self, StorageError> {
        if self.version == DOCUMENT_VERSION {
            Ok(self)
        } else {
            Err(StorageError::UnsupportedVersion(self.version))
        }
    }
}

/// Where the guest cart lives between sessions.
pub trait GuestCartStorage: Send {
    /// Load the stored document, or `None` if nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the document exists but cannot be read.
    fn load(&self) -> Result<Option<GuestCartDocument>, StorageError>;

    /// Replace the stored document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the document cannot be written.
    fn save(&self, document: &GuestCartDocument) -> Result<(), StorageError>;
}

// =============================================================================
// JSON File Storage
// =============================================================================

/// Guest cart stored in a JSON file.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a crash mid-write leaves the previous cart intact.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl GuestCartStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<GuestCartDocument>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let document: GuestCartDocument = serde_json::from_slice(&bytes)?;
        document.check_version().map(Some)
    }

    fn save(&self, document: &GuestCartDocument) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }
}

// =============================================================================
// In-Memory Storage
// =============================================================================

/// Guest cart held in memory only.
///
/// Clones share the same document, so a test can keep a handle and inspect
/// what the store persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    document: Arc<Mutex<Option<GuestCartDocument>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved document.
    #[must_use]
    pub fn snapshot(&self) -> Option<GuestCartDocument> {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl GuestCartStorage for MemoryStorage {
    fn load(&self) -> Result<Option<GuestCartDocument>, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, document: &GuestCartDocument) -> Result<(), StorageError> {
        *self
            .document
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(document.clone());
        Ok(())
    }
}
