//! # Wire Envelopes
//!
//! The outer [`WireEnvelope`] is what the transport sees. Its `body` and
//! `wrapped_key` are only meaningful together: neither can be opened alone.
//!
//! ## Layout
//!
//! ```text
//! WireEnvelope
//! ├── request_id        correlation id (replies echo the request's id)
//! ├── sender_identity   cert=<name> of the sealing actor
//! ├── filter / agent / collective   opaque routing data (requests)
//! ├── body              nonce || AES-256-GCM ciphertext
//! ├── wrapped_key       request: seed || RSA-PSS signature
//! │                     reply:   RSA-OAEP(content key)
//! └── pubkey            optional PEM public key of the sender (requests)
//! ```
//!
//! Requests carry a [`PlaintextEnvelope`] (`{ m, t }`) inside `body`; replies
//! carry the bare payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request filter: a string-keyed multimap, opaque to the security layer.
pub type Filter = BTreeMap<String, Vec<String>>;

/// The envelope handed to the transport after serialization.
///
/// Every field is always serialized (no skipped optionals) so that
/// non-self-describing formats such as bincode decode it unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Correlation id. Fresh for requests, echoed by replies.
    pub request_id: String,

    /// `cert=<name>` of the actor that sealed the envelope.
    pub sender_identity: Option<String>,

    /// Request filter; empty for replies.
    pub filter: Filter,

    /// Target agent of a request.
    pub agent: Option<String>,

    /// Target collective of a request.
    pub collective: Option<String>,

    /// Symmetric ciphertext.
    pub body: Vec<u8>,

    /// Key material needed to open `body`.
    pub wrapped_key: Vec<u8>,

    /// Sender public key (PEM), attached to requests for key learning.
    pub pubkey: Option<Vec<u8>>,
}

/// Timestamped request plaintext, sealed inside a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaintextEnvelope<T> {
    /// The application payload.
    #[serde(rename = "m")]
    pub payload: T,

    /// Issue time, float seconds since the Unix epoch (UTC).
    #[serde(rename = "t")]
    pub issued_at: f64,
}

impl<T> PlaintextEnvelope<T> {
    /// Wrap a payload with its issue time.
    pub fn new(payload: T, issued_at: f64) -> Self {
        Self { payload, issued_at }
    }

    /// Discard the timestamp.
    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// Addressing information for an outbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTarget {
    /// Filter selecting the responders that should act.
    pub filter: Filter,
    /// Agent the request is addressed to.
    pub agent: Option<String>,
    /// Collective the request is broadcast on.
    pub collective: Option<String>,
}

impl RequestTarget {
    /// Target an agent on a collective with an empty filter.
    pub fn new(agent: impl Into<String>, collective: impl Into<String>) -> Self {
        Self {
            filter: Filter::new(),
            agent: Some(agent.into()),
            collective: Some(collective.into()),
        }
    }

    /// Add a filter value under `key`.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.entry(key.into()).or_default().push(value.into());
        self
    }
}
