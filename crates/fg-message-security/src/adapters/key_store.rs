//! # Key-File Stores
//!
//! [`FileKeyStore`] backs the certificate directory on disk; new files are
//! written to a temporary file next to the target and published with a
//! no-clobber persist, so a concurrent writer can never replace a key that
//! is already cached. [`MemoryKeyStore`] gives the same semantics in memory
//! for unit tests.

use crate::ports::outbound::{KeyFileStore, StoreError, WriteOutcome};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Prefix of in-flight temporary files in the certificate directory.
const TEMP_PREFIX: &str = ".fg-learn-";

/// Filesystem-backed key store.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileKeyStore;

impl FileKeyStore {
    /// Create the store.
    pub fn new() -> Self {
        Self
    }
}

impl KeyFileStore for FileKeyStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        std::fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Io(e.to_string()),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn write_new(&self, path: &Path, bytes: &[u8]) -> Result<WriteOutcome, StoreError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        staged
            .write_all(bytes)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| StoreError::Io(e.to_string()))?;

        // The staged file is removed on drop if persisting fails.
        match staged.persist_noclobber(path) {
            Ok(_) => Ok(WriteOutcome::Created),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(WriteOutcome::AlreadyExists),
            Err(e) => Err(StoreError::Io(e.error.to_string())),
        }
    }
}

/// In-memory key store.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a file, replacing any previous content. Fixture helper.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.files.write().insert(path.into(), bytes.into());
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl KeyFileStore for MemoryKeyStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn write_new(&self, path: &Path, bytes: &[u8]) -> Result<WriteOutcome, StoreError> {
        use std::collections::hash_map::Entry;

        match self.files.write().entry(path.to_path_buf()) {
            Entry::Occupied(_) => Ok(WriteOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(bytes.to_vec());
                Ok(WriteOutcome::Created)
            }
        }
    }
}
