//! # Identity Resolution
//!
//! Maps identities to key files. The local identity comes from the basename
//! of the role's public key; remote identities resolve to
//! `<cert_dir>/<name>.pem`.

use crate::config::{ConfigError, SecurityConfig};
use crate::domain::errors::SecurityError;
use shared_types::{Identity, Role};
use std::path::{Path, PathBuf};

/// Resolves local and remote identities for one configured actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResolver {
    role: Role,
    local: Identity,
    cert_dir: Option<PathBuf>,
}

impl IdentityResolver {
    /// Build the resolver for a validated configuration.
    ///
    /// # Errors
    ///
    /// `SecurityError::UnknownIdentityFormat` when the public key's file name
    /// does not yield a valid identity.
    pub fn new(config: &SecurityConfig) -> Result<Self, SecurityError> {
        Ok(Self {
            role: config.role(),
            local: Identity::from_key_path(config.public_key_path())?,
            cert_dir: config.cert_dir().map(Path::to_path_buf),
        })
    }

    /// Role this resolver was built for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// This actor's identity.
    pub fn local_identity(&self) -> &Identity {
        &self.local
    }

    /// Parse a `cert=<name>` identity string.
    pub fn parse_identity(raw: &str) -> Result<Identity, SecurityError> {
        Ok(Identity::parse(raw)?)
    }

    /// Location of `identity`'s public key in the configured certificate
    /// directory.
    pub fn public_key_path_for(&self, identity: &Identity) -> Result<PathBuf, SecurityError> {
        let cert_dir = self
            .cert_dir
            .as_deref()
            .ok_or(ConfigError::MissingOption("client_cert_dir"))?;
        Ok(Self::key_path_in(identity, cert_dir))
    }

    /// Location of the public key for an identity string inside `cert_dir`.
    pub fn public_key_path_in(raw_identity: &str, cert_dir: &Path) -> Result<PathBuf, SecurityError> {
        let identity = Self::parse_identity(raw_identity)?;
        Ok(Self::key_path_in(&identity, cert_dir))
    }

    fn key_path_in(identity: &Identity, cert_dir: &Path) -> PathBuf {
        cert_dir.join(identity.key_file_name())
    }
}
