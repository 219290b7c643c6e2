//! # Public-Key Cache
//!
//! Append-only mapping from identity to PEM public key, stored as
//! `<cert_dir>/<name>.pem`. An entry is created at most once; the first key
//! seen for an identity is kept forever and later, different keys for the
//! same identity are ignored.
//!
//! Learning is trust-on-first-use: whoever presents a key for an identity
//! first wins. Distribute keys out of band where that is not acceptable.

use crate::domain::errors::SecurityError;
use crate::domain::identity::IdentityResolver;
use crate::ports::outbound::{KeyFileStore, StoreError, WriteOutcome};
use shared_crypto::RsaPublicMaterial;
use shared_types::Identity;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A cached public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertCacheEntry {
    /// Owner of the key.
    pub identity: Identity,
    /// PEM bytes exactly as first observed.
    pub public_key: Vec<u8>,
}

/// Result of [`KeyCache::learn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    /// The key was written to the cache.
    Created,
    /// A key for the identity was already cached; nothing changed.
    AlreadyKnown,
    /// The offered bytes are not a usable RSA public key; nothing changed.
    Rejected,
}

/// Why a cached public key could not be loaded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublicKeyLookupError {
    /// No key file for the identity.
    #[error("no public key at {0:?}")]
    Missing(PathBuf),

    /// The key file exists but cannot be read or parsed.
    #[error("unusable public key at {path:?}: {reason}")]
    Unusable {
        /// Key file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

/// The certificate-directory cache.
#[derive(Clone)]
pub struct KeyCache {
    resolver: IdentityResolver,
    store: Arc<dyn KeyFileStore>,
}

impl KeyCache {
    /// Create a cache over `store`, locating files with `resolver`.
    pub fn new(resolver: IdentityResolver, store: Arc<dyn KeyFileStore>) -> Self {
        Self { resolver, store }
    }

    /// Cache `public_key` for `identity` unless a key is already cached.
    ///
    /// # Errors
    ///
    /// `SecurityError::KeyMaterial` when the store cannot be written, and
    /// `SecurityError::Configuration` when no certificate directory is set.
    pub fn learn(&self, identity: &Identity, public_key: &[u8]) -> Result<LearnOutcome, SecurityError> {
        let path = self.resolver.public_key_path_for(identity)?;

        if self.store.exists(&path) {
            debug!(identity = %identity, "Public key already cached");
            return Ok(LearnOutcome::AlreadyKnown);
        }

        if let Err(e) = RsaPublicMaterial::from_pem(public_key) {
            warn!(identity = %identity, error = %e, "Refusing to cache unusable public key");
            return Ok(LearnOutcome::Rejected);
        }

        match self.store.write_new(&path, public_key) {
            Ok(WriteOutcome::Created) => {
                info!(identity = %identity, path = %path.display(), "Learned public key");
                Ok(LearnOutcome::Created)
            }
            Ok(WriteOutcome::AlreadyExists) => {
                debug!(identity = %identity, "Lost learn race, keeping existing key");
                Ok(LearnOutcome::AlreadyKnown)
            }
            Err(e) => Err(SecurityError::KeyMaterial {
                path,
                reason: e.to_string(),
            }),
        }
    }

    /// Path of `identity`'s cached key. Existence is not checked.
    pub fn lookup(&self, identity: &Identity) -> Result<PathBuf, SecurityError> {
        self.resolver.public_key_path_for(identity)
    }

    /// Read the cached entry for `identity`, if any.
    pub fn entry(&self, identity: &Identity) -> Result<Option<CertCacheEntry>, SecurityError> {
        let path = self.lookup(identity)?;
        match self.store.read(&path) {
            Ok(public_key) => Ok(Some(CertCacheEntry {
                identity: identity.clone(),
                public_key,
            })),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(SecurityError::KeyMaterial {
                path,
                reason: e.to_string(),
            }),
        }
    }

    /// Load and parse the public key stored at `path`.
    pub fn load_public_key(&self, path: &Path) -> Result<RsaPublicMaterial, PublicKeyLookupError> {
        let pem = self.store.read(path).map_err(|e| match e {
            StoreError::NotFound => PublicKeyLookupError::Missing(path.to_path_buf()),
            other => PublicKeyLookupError::Unusable {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;

        RsaPublicMaterial::from_pem(&pem).map_err(|e| PublicKeyLookupError::Unusable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
