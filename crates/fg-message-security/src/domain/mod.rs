//! # Domain Layer
//!
//! Identity resolution, key learning, hybrid encryption and replay checks.
//! Nothing here performs I/O directly; key files and time come through the
//! outbound ports.

pub mod crypto_engine;
pub mod errors;
pub mod identity;
pub mod key_cache;
pub mod replay;

pub use crypto_engine::CryptoEngine;
pub use errors::{DecryptionFailureReason, SecurityError};
pub use identity::IdentityResolver;
pub use key_cache::{CertCacheEntry, KeyCache, LearnOutcome};
pub use replay::ReplayGuard;
