//! # Adapters Module
//!
//! Infrastructure adapters implementing the outbound ports, plus the
//! serializer pair selected by configuration.

pub mod clock;
pub mod key_store;
pub mod serializer;

pub use clock::{ManualClock, SystemClock};
pub use key_store::{FileKeyStore, MemoryKeyStore};
pub use serializer::{SerializationError, Serializer};
