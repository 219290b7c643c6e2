//! # Actor Identities
//!
//! Every actor on the fabric is named by the basename of its public-key file.
//! On the wire the name travels as `cert=<name>`; the same name selects the
//! `<name>.pem` file in the certificate directory.
//!
//! ## Security Properties
//!
//! - **No Path Escape**: Names are restricted to ASCII alphanumerics, `_`,
//!   `.` and `-`. A parsed identity can never contain a path separator.
//! - **Non-Empty**: `cert=` alone is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Prefix of the canonical identity form.
pub const IDENTITY_PREFIX: &str = "cert=";

/// Errors raised while deriving or parsing an identity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The string is not of the form `cert=<name>`.
    #[error("Unknown identity format: {0:?}")]
    UnknownFormat(String),

    /// The key path has no usable file stem.
    #[error("Cannot derive identity from key path {0:?}")]
    UnusableKeyPath(String),
}

/// Which side of a request/reply exchange an actor plays.
///
/// The role selects the local key pair and the encryption direction, and is
/// fixed for the lifetime of a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Issues broadcast requests and decodes replies addressed to it.
    Caller,
    /// Decodes broadcast requests and replies to the requester.
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Caller => write!(f, "caller"),
            Role::Responder => write!(f, "responder"),
        }
    }
}

/// A validated actor identity.
///
/// Displays (and serializes) as `cert=<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    name: String,
}

impl Identity {
    /// Parse the canonical `cert=<name>` form.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        match s.strip_prefix(IDENTITY_PREFIX) {
            Some(name) if is_valid_name(name) => Ok(Self {
                name: name.to_string(),
            }),
            _ => Err(IdentityError::UnknownFormat(s.to_string())),
        }
    }

    /// Build an identity from a bare name.
    pub fn from_name(name: &str) -> Result<Self, IdentityError> {
        if is_valid_name(name) {
            Ok(Self {
                name: name.to_string(),
            })
        } else {
            Err(IdentityError::UnknownFormat(format!(
                "{IDENTITY_PREFIX}{name}"
            )))
        }
    }

    /// Derive an identity from a public-key file path.
    ///
    /// The basename with its extension stripped becomes the name, so
    /// `/etc/fabric/ssl/alice.pem` yields `cert=alice`.
    pub fn from_key_path(path: &Path) -> Result<Self, IdentityError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| IdentityError::UnusableKeyPath(path.display().to_string()))?;
        Self::from_name(stem)
    }

    /// The bare name, without the `cert=` prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of this identity's public key inside a certificate directory.
    pub fn key_file_name(&self) -> String {
        format!("{}.pem", self.name)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{IDENTITY_PREFIX}{}", self.name)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Identity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
