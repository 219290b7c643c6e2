//! # Message Codec Service
//!
//! Application service implementing [`MessageSecurityApi`].
//!
//! ## Flows
//!
//! ```text
//! encode_request: stamp → serialize {m,t} → seal with private key → envelope (+pubkey) → serialize
//! encode_reply:   serialize payload → seal for recipient public key → envelope → serialize
//! decode (Responder): envelope → learn pubkey → load sender key → open → {m,t} → replay check
//! decode (Caller):    envelope → open with private key → payload
//! ```
//!
//! ## Associated Data
//!
//! The envelope header (direction, request id, sender identity, agent,
//! collective, filter) is authenticated as AEAD associated data and, for
//! requests, covered by the signature. Changing any header field in transit
//! makes the envelope fail to open.
//!
//! ## Decode Failures
//!
//! Callers only see the coarse [`SecurityError`] classes. The specific reason
//! for a `SecurityValidationFailure` is logged at `warn` and never returned.

use crate::adapters::{FileKeyStore, SerializationError, Serializer, SystemClock};
use crate::config::SecurityConfig;
use crate::domain::errors::{DecryptionFailureReason, SecurityError};
use crate::domain::key_cache::PublicKeyLookupError;
use crate::domain::{CryptoEngine, IdentityResolver, KeyCache, ReplayGuard};
use crate::ports::inbound::MessageSecurityApi;
use crate::ports::outbound::{Clock, KeyFileStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_crypto::{CryptoError, RsaPublicMaterial};
use shared_types::{Filter, Identity, PlaintextEnvelope, RequestTarget, Role, WireEnvelope};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Domain separation prefix of the associated data.
const AAD_DOMAIN: &[u8] = b"fabric-guard/header/v1";

/// A successfully decoded message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage<T> {
    /// Correlation id from the envelope.
    pub request_id: String,
    /// Authenticated sender. Set for requests decoded by a Responder.
    pub sender: Option<Identity>,
    /// Issue time of the request. Set for requests decoded by a Responder.
    pub issued_at: Option<f64>,
    /// The application payload.
    pub payload: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Request = 1,
    Reply = 2,
}

/// Internal decode failure. Only its class reaches the caller.
#[derive(Debug, Error)]
enum DecodeFault {
    #[error("envelope does not deserialize: {0}")]
    Envelope(SerializationError),

    #[error("request carries no sender identity")]
    MissingSender,

    #[error("{0}")]
    Identity(SecurityError),

    #[error("{0}")]
    KeyLookup(PublicKeyLookupError),

    #[error("cannot resolve sender key: {0}")]
    Resolve(SecurityError),

    #[error("cryptographic check failed: {0}")]
    Crypto(CryptoError),

    #[error("payload does not deserialize: {0}")]
    Payload(SerializationError),

    #[error("{0}")]
    Stale(SecurityError),
}

impl From<DecodeFault> for SecurityError {
    fn from(fault: DecodeFault) -> Self {
        match fault {
            DecodeFault::Identity(err) | DecodeFault::Stale(err) => err,
            DecodeFault::KeyLookup(PublicKeyLookupError::Missing(_)) => {
                SecurityError::DecryptionFailure(DecryptionFailureReason::MissingPublicKey)
            }
            DecodeFault::Crypto(_) => {
                SecurityError::DecryptionFailure(DecryptionFailureReason::KeyMismatch)
            }
            DecodeFault::Envelope(_)
            | DecodeFault::MissingSender
            | DecodeFault::KeyLookup(PublicKeyLookupError::Unusable { .. })
            | DecodeFault::Resolve(_)
            | DecodeFault::Payload(_) => SecurityError::SecurityValidationFailure,
        }
    }
}

/// Encodes and decodes secured envelopes for one actor.
///
/// Immutable after construction apart from the key cache, and safe to share
/// across threads.
pub struct MessageCodec {
    role: Role,
    config: SecurityConfig,
    serializer: Serializer,
    resolver: IdentityResolver,
    cache: KeyCache,
    engine: CryptoEngine,
    replay: ReplayGuard,
}

impl MessageCodec {
    /// Create a codec backed by the filesystem and the system clock.
    pub fn new(config: SecurityConfig) -> Result<Self, SecurityError> {
        Self::with_collaborators(config, Arc::new(FileKeyStore::new()), Arc::new(SystemClock))
    }

    /// Create a codec with explicit collaborators.
    ///
    /// # Errors
    ///
    /// * `SecurityError::KeyMaterial` - the role's key pair cannot be loaded
    /// * `SecurityError::UnknownIdentityFormat` - the public key's file name
    ///   is not a valid identity
    pub fn with_collaborators(
        config: SecurityConfig,
        store: Arc<dyn KeyFileStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SecurityError> {
        let resolver = IdentityResolver::new(&config)?;
        let engine = CryptoEngine::load(&config, store.as_ref())?;
        let cache = KeyCache::new(resolver.clone(), store);
        let replay = ReplayGuard::new(clock, config.maximum_age());
        let serializer = Serializer::from(config.serializer());

        tracing::info!(
            "[fg-security] Codec ready as {} for {} ({} serializer)",
            config.role(),
            resolver.local_identity(),
            serializer.name()
        );

        Ok(Self {
            role: config.role(),
            config,
            serializer,
            resolver,
            cache,
            engine,
            replay,
        })
    }

    /// Role this codec decodes for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// This actor's identity, as placed in outbound envelopes.
    pub fn local_identity(&self) -> &Identity {
        self.resolver.local_identity()
    }

    /// The public-key cache.
    pub fn key_cache(&self) -> &KeyCache {
        &self.cache
    }

    fn seal_envelope(
        &self,
        direction: Direction,
        mut envelope: WireEnvelope,
        plaintext: &[u8],
        recipient: Option<&RsaPublicMaterial>,
    ) -> Result<Vec<u8>, SecurityError> {
        let aad = header_aad(direction, &envelope);
        let sealed = match recipient {
            Some(public) => self.engine.encrypt_with_public(plaintext, public, &aad),
            None => self.engine.encrypt_with_private(plaintext, &aad),
        }
        .map_err(|e| SecurityError::Encode(e.to_string()))?;

        envelope.body = sealed.body;
        envelope.wrapped_key = sealed.wrapped_key;
        self.serializer
            .serialize(&envelope)
            .map_err(|e| SecurityError::Encode(e.to_string()))
    }

    fn decode_request<T: DeserializeOwned>(
        &self,
        envelope: WireEnvelope,
    ) -> Result<DecodedMessage<T>, DecodeFault> {
        let raw_sender = envelope
            .sender_identity
            .as_deref()
            .ok_or(DecodeFault::MissingSender)?;
        let sender = IdentityResolver::parse_identity(raw_sender).map_err(DecodeFault::Identity)?;

        if self.config.learn_pubkeys() {
            if let Some(public_key) = envelope.pubkey.as_deref() {
                // Learning is best effort; a cached key may already exist.
                if let Err(e) = self.cache.learn(&sender, public_key) {
                    warn!("[fg-security] Could not cache key for {}: {}", sender, e);
                }
            }
        }

        let path = self.cache.lookup(&sender).map_err(DecodeFault::Resolve)?;
        let public = self
            .cache
            .load_public_key(&path)
            .map_err(DecodeFault::KeyLookup)?;

        let aad = header_aad(Direction::Request, &envelope);
        let plaintext = self
            .engine
            .decrypt_with_public(&envelope.body, &envelope.wrapped_key, &public, &aad)
            .map_err(DecodeFault::Crypto)?;

        let stamped: PlaintextEnvelope<T> = self
            .serializer
            .deserialize(&plaintext)
            .map_err(DecodeFault::Payload)?;
        let age = self.replay.check_fresh(&stamped).map_err(DecodeFault::Stale)?;

        debug!(
            request_id = %envelope.request_id,
            sender = %sender,
            age,
            "Request decoded"
        );

        Ok(DecodedMessage {
            request_id: envelope.request_id,
            sender: Some(sender),
            issued_at: Some(stamped.issued_at),
            payload: stamped.payload,
        })
    }

    fn decode_reply<T: DeserializeOwned>(
        &self,
        envelope: WireEnvelope,
    ) -> Result<DecodedMessage<T>, DecodeFault> {
        let aad = header_aad(Direction::Reply, &envelope);
        let plaintext = self
            .engine
            .decrypt_with_private(&envelope.body, &envelope.wrapped_key, &aad)
            .map_err(DecodeFault::Crypto)?;
        let payload: T = self
            .serializer
            .deserialize(&plaintext)
            .map_err(DecodeFault::Payload)?;

        debug!(request_id = %envelope.request_id, "Reply decoded");

        Ok(DecodedMessage {
            request_id: envelope.request_id,
            sender: None,
            issued_at: None,
            payload,
        })
    }
}

impl MessageSecurityApi for MessageCodec {
    fn encode_request<T: Serialize>(
        &self,
        payload: &T,
        target: &RequestTarget,
    ) -> Result<Vec<u8>, SecurityError> {
        let plaintext = self
            .serializer
            .serialize(&self.replay.stamp(payload))
            .map_err(|e| SecurityError::Encode(e.to_string()))?;

        let envelope = WireEnvelope {
            request_id: new_request_id(),
            sender_identity: Some(self.local_identity().to_string()),
            filter: target.filter.clone(),
            agent: target.agent.clone(),
            collective: target.collective.clone(),
            body: Vec::new(),
            wrapped_key: Vec::new(),
            pubkey: self
                .config
                .send_pubkey()
                .then(|| self.engine.local_public_pem().to_vec()),
        };

        debug!(
            request_id = %envelope.request_id,
            agent = envelope.agent.as_deref().unwrap_or(""),
            "Encoding request"
        );
        self.seal_envelope(Direction::Request, envelope, &plaintext, None)
    }

    fn encode_reply<T: Serialize>(
        &self,
        payload: &T,
        recipient: &Identity,
        request_id: &str,
    ) -> Result<Vec<u8>, SecurityError> {
        let path = self.cache.lookup(recipient)?;
        let public = self.cache.load_public_key(&path).map_err(|e| match e {
            PublicKeyLookupError::Missing(path) => SecurityError::KeyUnavailable {
                identity: recipient.to_string(),
                path,
            },
            PublicKeyLookupError::Unusable { path, reason } => {
                SecurityError::KeyMaterial { path, reason }
            }
        })?;

        let plaintext = self
            .serializer
            .serialize(payload)
            .map_err(|e| SecurityError::Encode(e.to_string()))?;

        let envelope = WireEnvelope {
            request_id: request_id.to_string(),
            sender_identity: Some(self.local_identity().to_string()),
            filter: Filter::new(),
            agent: None,
            collective: None,
            body: Vec::new(),
            wrapped_key: Vec::new(),
            pubkey: None,
        };

        debug!(request_id, recipient = %recipient, "Encoding reply");
        self.seal_envelope(Direction::Reply, envelope, &plaintext, Some(&public))
    }

    fn decode<T: DeserializeOwned>(&self, wire: &[u8]) -> Result<DecodedMessage<T>, SecurityError> {
        let envelope: WireEnvelope = match self.serializer.deserialize(wire) {
            Ok(envelope) => envelope,
            Err(e) => {
                let fault = DecodeFault::Envelope(e);
                warn!("[fg-security] Rejected message: {}", fault);
                return Err(fault.into());
            }
        };

        let request_id = envelope.request_id.clone();
        let decoded = match self.role {
            Role::Responder => self.decode_request(envelope),
            Role::Caller => self.decode_reply(envelope),
        };

        decoded.map_err(|fault| {
            warn!("[fg-security] Rejected message {}: {}", request_id, fault);
            fault.into()
        })
    }

    fn peek_envelope(&self, wire: &[u8]) -> Result<WireEnvelope, SecurityError> {
        self.serializer.deserialize(wire).map_err(|e| {
            warn!("[fg-security] Unreadable envelope: {}", e);
            SecurityError::SecurityValidationFailure
        })
    }
}

impl std::fmt::Debug for MessageCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCodec")
            .field("role", &self.role)
            .field("identity", self.local_identity())
            .field("serializer", &self.serializer)
            .finish_non_exhaustive()
    }
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Canonical, length-prefixed encoding of the authenticated header fields.
fn header_aad(direction: Direction, envelope: &WireEnvelope) -> Vec<u8> {
    fn field(out: &mut Vec<u8>, bytes: &[u8]) {
        out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
        out.extend_from_slice(bytes);
    }

    fn optional(out: &mut Vec<u8>, value: Option<&str>) {
        match value {
            Some(v) => {
                out.push(1);
                field(out, v.as_bytes());
            }
            None => out.push(0),
        }
    }

    let mut aad = Vec::with_capacity(128);
    aad.extend_from_slice(AAD_DOMAIN);
    aad.push(direction as u8);
    field(&mut aad, envelope.request_id.as_bytes());
    optional(&mut aad, envelope.sender_identity.as_deref());
    optional(&mut aad, envelope.agent.as_deref());
    optional(&mut aad, envelope.collective.as_deref());

    aad.extend_from_slice(&(envelope.filter.len() as u64).to_be_bytes());
    for (key, values) in &envelope.filter {
        field(&mut aad, key.as_bytes());
        aad.extend_from_slice(&(values.len() as u64).to_be_bytes());
        for value in values {
            field(&mut aad, value.as_bytes());
        }
    }
    aad
}
