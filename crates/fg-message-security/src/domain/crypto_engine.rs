//! # Crypto Engine
//!
//! Hybrid encryption for one actor, holding that actor's RSA key pair.
//!
//! | Direction | Sealed with | Opened with | Guarantees |
//! |-----------|-------------|-------------|------------|
//! | Request (Caller → Responders) | caller private key | caller public key | origin authenticity |
//! | Reply (Responder → Caller) | caller public key | caller private key | confidentiality |
//!
//! Request bodies are readable by anyone holding the caller's public key;
//! that is accepted for broadcast requests.

use crate::config::SecurityConfig;
use crate::domain::errors::SecurityError;
use crate::ports::outbound::KeyFileStore;
use shared_crypto::{
    open_sealed, open_signed, seal_for, seal_signed, CryptoError, RsaKeyPair, RsaPublicMaterial,
    Sealed,
};
use shared_types::Role;
use std::path::Path;
use tracing::debug;

/// An actor's key pair and the four hybrid operations built on it.
#[derive(Debug)]
pub struct CryptoEngine {
    role: Role,
    key_pair: RsaKeyPair,
}

impl CryptoEngine {
    /// Load the role's key pair through `store`.
    ///
    /// # Errors
    ///
    /// `SecurityError::KeyMaterial` naming the file that could not be read,
    /// or the private key when the pair does not parse or does not match.
    pub fn load(config: &SecurityConfig, store: &dyn KeyFileStore) -> Result<Self, SecurityError> {
        let private_pem = read_key_file(store, config.private_key_path())?;
        let public_pem = read_key_file(store, config.public_key_path())?;

        let key_pair = RsaKeyPair::from_pem(&private_pem, &public_pem).map_err(|e| {
            SecurityError::KeyMaterial {
                path: config.private_key_path().to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        debug!(
            role = %config.role(),
            key = %config.public_key_path().display(),
            "Loaded key pair"
        );
        Ok(Self::from_key_pair(config.role(), key_pair))
    }

    /// Wrap an already loaded key pair.
    pub fn from_key_pair(role: Role, key_pair: RsaKeyPair) -> Self {
        Self { role, key_pair }
    }

    /// Role whose key pair this engine holds.
    pub fn role(&self) -> Role {
        self.role
    }

    /// PEM of the local public key, as attached to outbound requests.
    pub fn local_public_pem(&self) -> &[u8] {
        self.key_pair.public().pem()
    }

    /// Request direction: seal so that holders of the local public key can
    /// verify origin.
    pub fn encrypt_with_private(&self, plaintext: &[u8], aad: &[u8]) -> Result<Sealed, CryptoError> {
        seal_signed(&self.key_pair, plaintext, aad)
    }

    /// Request direction: open a body sealed by `sender`.
    pub fn decrypt_with_public(
        &self,
        body: &[u8],
        wrapped_key: &[u8],
        sender: &RsaPublicMaterial,
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        open_signed(sender, body, wrapped_key, aad)
    }

    /// Reply direction: seal so that only `recipient` can read it.
    pub fn encrypt_with_public(
        &self,
        plaintext: &[u8],
        recipient: &RsaPublicMaterial,
        aad: &[u8],
    ) -> Result<Sealed, CryptoError> {
        seal_for(recipient, plaintext, aad)
    }

    /// Reply direction: open a body sealed for the local key pair.
    pub fn decrypt_with_private(
        &self,
        body: &[u8],
        wrapped_key: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        open_sealed(&self.key_pair, body, wrapped_key, aad)
    }
}

fn read_key_file(store: &dyn KeyFileStore, path: &Path) -> Result<Vec<u8>, SecurityError> {
    store.read(path).map_err(|e| SecurityError::KeyMaterial {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryKeyStore;
    use crate::config::SecurityOptions;
    use crate::test_support::{alice, bob, copy_pair};

    fn caller_config() -> SecurityConfig {
        SecurityOptions::from_options([
            ("client_private", "/keys/alice-private.pem"),
            ("client_public", "/keys/alice.pem"),
        ])
        .unwrap()
        .validate(Role::Caller)
        .unwrap()
    }

    fn engine(pair: &RsaKeyPair, role: Role) -> CryptoEngine {
        CryptoEngine::from_key_pair(role, copy_pair(pair))
    }

    #[test]
    fn test_load_from_store() {
        let store = MemoryKeyStore::new();
        store.insert("/keys/alice-private.pem", alice().private_key_pem().unwrap());
        store.insert("/keys/alice.pem", alice().public().pem().to_vec());

        let engine = CryptoEngine::load(&caller_config(), &store).unwrap();
        assert_eq!(engine.role(), Role::Caller);
        assert_eq!(engine.local_public_pem(), alice().public().pem());
    }

    #[test]
    fn test_load_names_missing_file() {
        let store = MemoryKeyStore::new();
        store.insert("/keys/alice-private.pem", alice().private_key_pem().unwrap());

        match CryptoEngine::load(&caller_config(), &store) {
            Err(SecurityError::KeyMaterial { path, .. }) => {
                assert_eq!(path, Path::new("/keys/alice.pem"))
            }
            other => panic!("expected KeyMaterial error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_mismatched_pair() {
        let store = MemoryKeyStore::new();
        store.insert("/keys/alice-private.pem", alice().private_key_pem().unwrap());
        store.insert("/keys/alice.pem", bob().public().pem().to_vec());

        assert!(matches!(
            CryptoEngine::load(&caller_config(), &store),
            Err(SecurityError::KeyMaterial { .. })
        ));
    }

    #[test]
    fn test_request_direction() {
        let caller = engine(alice(), Role::Caller);
        let responder = engine(bob(), Role::Responder);

        let sealed = caller.encrypt_with_private(b"ping", b"hdr").unwrap();
        let opened = responder
            .decrypt_with_public(&sealed.body, &sealed.wrapped_key, alice().public(), b"hdr")
            .unwrap();
        assert_eq!(opened, b"ping");

        // Claiming a different sender fails verification.
        assert!(responder
            .decrypt_with_public(&sealed.body, &sealed.wrapped_key, bob().public(), b"hdr")
            .is_err());
    }

    #[test]
    fn test_reply_direction() {
        let caller = engine(alice(), Role::Caller);
        let responder = engine(bob(), Role::Responder);

        let sealed = responder
            .encrypt_with_public(b"pong", alice().public(), b"hdr")
            .unwrap();
        assert_eq!(
            caller
                .decrypt_with_private(&sealed.body, &sealed.wrapped_key, b"hdr")
                .unwrap(),
            b"pong"
        );

        // The responder cannot read what it sealed for the caller.
        assert!(responder
            .decrypt_with_private(&sealed.body, &sealed.wrapped_key, b"hdr")
            .is_err());
    }
}
