//! # Fabric Guard Test Suite
//!
//! Unified test crate for flows that span more than one crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs       # Key directories on disk
//!     ├── request_reply.rs  # Caller ↔ Responder exchanges
//!     └── key_learning.rs   # Trust-on-first-use key caching
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fg-tests
//! cargo test -p fg-tests integration::key_learning
//! ```

pub mod integration;
