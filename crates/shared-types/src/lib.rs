//! # Shared Types Crate
//!
//! This crate contains the wire data model of Fabric Guard: the actor
//! [`Role`], the `cert=<name>` [`Identity`], and the envelopes that travel
//! over the broadcast fabric.
//!
//! ## Design Principles
//!
//! - **Envelope Authority**: The envelope's `sender_identity` is the sole
//!   claim of origin. It is only trusted after the body has been opened with
//!   that identity's public key.
//! - **Opaque Routing**: Filters, agents and collectives are carried verbatim;
//!   this layer never interprets them.

pub mod envelope;
pub mod identity;

pub use envelope::{Filter, PlaintextEnvelope, RequestTarget, WireEnvelope};
pub use identity::{Identity, IdentityError, Role, IDENTITY_PREFIX};
