//! # Security Errors
//!
//! The error surface of the codec.
//!
//! ## Propagation Rules
//!
//! | Error | Raised | Meaning for the caller |
//! |-------|--------|------------------------|
//! | `UnknownIdentityFormat` | anywhere | fix the identity / configuration |
//! | `Configuration`, `KeyMaterial` | construction | fix the configuration |
//! | `KeyUnavailable`, `Encode` | encode | local failure, nothing was sent |
//! | `DecryptionFailure` | decode | message not for this actor (drop or re-route) |
//! | `ReplayRejected` | decode | stale request, never reprocess |
//! | `SecurityValidationFailure` | decode | anything else; detail is only logged |

use crate::config::ConfigError;
use shared_types::IdentityError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a message could not be decrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionFailureReason {
    /// Wrong key or corrupted ciphertext. The two are deliberately collapsed.
    KeyMismatch,
    /// No public key is cached for the claimed sender.
    MissingPublicKey,
}

impl fmt::Display for DecryptionFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecryptionFailureReason::KeyMismatch => {
                write!(f, "key mismatch or corrupted ciphertext")
            }
            DecryptionFailureReason::MissingPublicKey => {
                write!(f, "no public key available for sender")
            }
        }
    }
}

/// Errors surfaced by the message codec.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SecurityError {
    /// Malformed identity string.
    #[error("Unknown identity format: {0}")]
    UnknownIdentityFormat(String),

    /// Missing or invalid configuration option.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A local key file could not be read or parsed.
    #[error("Key material error for {path:?}: {reason}")]
    KeyMaterial {
        /// Offending key file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The recipient's public key is not available for an outbound reply.
    #[error("No public key for {identity} at {path:?}")]
    KeyUnavailable {
        /// Recipient identity (`cert=<name>`).
        identity: String,
        /// Where the key was expected.
        path: PathBuf,
    },

    /// Local serialization or encryption failure while encoding.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// The message cannot be decrypted with the keys at hand.
    #[error("Decryption failure: {0}")]
    DecryptionFailure(DecryptionFailureReason),

    /// The request is older than the replay window allows.
    #[error("Replay rejected: message is {age:.3}s old, maximum age is {max_age}s")]
    ReplayRejected {
        /// Observed age in seconds.
        age: f64,
        /// Configured maximum age in seconds.
        max_age: u64,
    },

    /// Any other failure while decoding. Carries no detail on purpose.
    #[error("Security validation failure")]
    SecurityValidationFailure,
}

impl SecurityError {
    /// True when the message was simply not addressed to this actor's keys.
    pub fn is_not_for_me(&self) -> bool {
        matches!(self, SecurityError::DecryptionFailure(_))
    }

    /// True for replayed/stale messages, which must never be retried.
    pub fn is_replay(&self) -> bool {
        matches!(self, SecurityError::ReplayRejected { .. })
    }
}

impl From<IdentityError> for SecurityError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UnknownFormat(raw) | IdentityError::UnusableKeyPath(raw) => {
                SecurityError::UnknownIdentityFormat(raw)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decryption_failure_message_is_generic() {
        let err = SecurityError::DecryptionFailure(DecryptionFailureReason::KeyMismatch);
        assert_eq!(
            err.to_string(),
            "Decryption failure: key mismatch or corrupted ciphertext"
        );
        assert!(err.is_not_for_me());
        assert!(!err.is_replay());
    }

    #[test]
    fn test_validation_failure_has_no_detail() {
        assert_eq!(
            SecurityError::SecurityValidationFailure.to_string(),
            "Security validation failure"
        );
    }

    #[test]
    fn test_identity_error_conversion() {
        let err: SecurityError = IdentityError::UnknownFormat("alice".to_string()).into();
        assert_eq!(err, SecurityError::UnknownIdentityFormat("alice".to_string()));
    }
}
