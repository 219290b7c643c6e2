//! # Shared Crypto - Hybrid Envelope Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | AES-256-GCM | Body encryption |
//! | `keys` | RSA (PEM, PKCS#8 / PKCS#1) | Actor key material |
//! | `hybrid` | RSA-PSS + HKDF, RSA-OAEP | Request signing, reply key wrapping |
//!
//! ## Security Properties
//!
//! - **AES-256-GCM**: Fresh content key per message, random 96-bit nonce
//! - **RSA-PSS-SHA256**: Randomized, blinded signing
//! - **RSA-OAEP-SHA256**: Padded key wrapping, never raw RSA
//! - **HKDF-SHA256**: Content keys bound to the signer's SPKI

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hybrid;
pub mod keys;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use hybrid::{open_sealed, open_signed, seal_for, seal_signed, Sealed};
pub use keys::{RsaKeyPair, RsaPublicMaterial, MIN_MODULUS_BITS};
pub use symmetric::{Nonce, SecretKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
