//! # Fabric Guard Message Security
//!
//! Hybrid-encryption codec for a broadcast request/reply fabric.
//!
//! ## Guarantees
//!
//! | Message | Property | Mechanism |
//! |---------|----------|-----------|
//! | Request | Origin authenticity | RSA-PSS over the sealed body and header |
//! | Request | Freshness | Signed timestamp, `maximum_age` window |
//! | Reply | Confidentiality | AES-256-GCM, key wrapped with RSA-OAEP for the requester |
//! | Both | Header integrity | Header bound as AEAD associated data |
//!
//! Request bodies are readable by anyone holding the caller's public key.
//!
//! ## Architecture
//!
//! - `domain/` - identity resolution, key cache, crypto engine, replay guard
//! - `ports/` - [`MessageSecurityApi`] and the key-store / clock traits
//! - `adapters/` - filesystem and in-memory stores, clocks, serializers
//! - `service` - [`MessageCodec`]
//!
//! ## Usage
//!
//! ```ignore
//! let config = SecurityOptions::from_yaml_file(path)?
//!     .with_env_overrides()
//!     .validate(Role::Caller)?;
//! let codec = MessageCodec::new(config)?;
//! let wire = codec.encode_request(&payload, &RequestTarget::new("service", "main"))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{FileKeyStore, ManualClock, MemoryKeyStore, SerializationError, Serializer, SystemClock};
pub use config::{ConfigError, SecurityConfig, SecurityOptions, SerializerKind};
pub use domain::{
    CertCacheEntry, CryptoEngine, DecryptionFailureReason, IdentityResolver, KeyCache,
    LearnOutcome, ReplayGuard, SecurityError,
};
pub use ports::inbound::MessageSecurityApi;
pub use ports::outbound::{Clock, KeyFileStore, StoreError, WriteOutcome};
pub use service::{DecodedMessage, MessageCodec};
