//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the codec needs from its environment.

use std::path::Path;
use thiserror::Error;

/// Error from key-file storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No file at the path.
    #[error("Key file not found")]
    NotFound,

    /// Any other storage failure.
    #[error("Key file I/O error: {0}")]
    Io(String),
}

/// Result of a create-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file did not exist and now holds the written bytes.
    Created,
    /// A file was already present; it was left untouched.
    AlreadyExists,
}

/// Storage of PEM key files, addressed by path.
///
/// `write_new` must be atomic with respect to concurrent writers of the same
/// path: exactly one of them observes `Created`, and readers never see a
/// partially written file.
pub trait KeyFileStore: Send + Sync {
    /// Read a whole key file.
    fn read(&self, path: &Path) -> Result<Vec<u8>, StoreError>;

    /// Whether a key file exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` holding `bytes` unless it already exists.
    fn write_new(&self, path: &Path, bytes: &[u8]) -> Result<WriteOutcome, StoreError>;
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch (UTC), with sub-second precision.
    fn now_utc_seconds(&self) -> f64;
}
