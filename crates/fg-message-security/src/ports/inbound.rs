//! # Inbound Ports (Driving Ports / API)
//!
//! The public API of the message-security layer.

use crate::domain::errors::SecurityError;
use crate::service::DecodedMessage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{Identity, RequestTarget, WireEnvelope};

/// Encoding and decoding of secured envelopes.
///
/// Implementations must be thread-safe (`Send + Sync`). The role is fixed at
/// construction and decides how `decode` treats an envelope.
pub trait MessageSecurityApi: Send + Sync {
    /// Stamp, sign and seal a broadcast request.
    ///
    /// # Errors
    /// * `SecurityError::Encode` - serialization or encryption failed locally
    fn encode_request<T: Serialize>(
        &self,
        payload: &T,
        target: &RequestTarget,
    ) -> Result<Vec<u8>, SecurityError>;

    /// Seal a reply so only `recipient` can read it.
    ///
    /// # Errors
    /// * `SecurityError::KeyUnavailable` - no cached public key for `recipient`
    /// * `SecurityError::Encode` - serialization or encryption failed locally
    fn encode_reply<T: Serialize>(
        &self,
        payload: &T,
        recipient: &Identity,
        request_id: &str,
    ) -> Result<Vec<u8>, SecurityError>;

    /// Open an inbound envelope.
    ///
    /// # Errors
    /// * `SecurityError::DecryptionFailure` - not addressed to this actor's keys
    /// * `SecurityError::UnknownIdentityFormat` - malformed sender identity
    /// * `SecurityError::ReplayRejected` - request older than the window
    /// * `SecurityError::SecurityValidationFailure` - anything else
    fn decode<T: DeserializeOwned>(&self, wire: &[u8])
        -> Result<DecodedMessage<T>, SecurityError>;

    /// Deserialize the outer envelope without any cryptographic checks.
    fn peek_envelope(&self, wire: &[u8]) -> Result<WireEnvelope, SecurityError>;
}
