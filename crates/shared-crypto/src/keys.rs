//! # RSA Key Material
//!
//! PEM loading for the long-lived actor keys.
//!
//! ## Accepted Encodings
//!
//! | Key | Encodings |
//! |-----|-----------|
//! | Private | PKCS#8 (`BEGIN PRIVATE KEY`), PKCS#1 (`BEGIN RSA PRIVATE KEY`) |
//! | Public | SPKI (`BEGIN PUBLIC KEY`), PKCS#1 (`BEGIN RSA PUBLIC KEY`) |
//!
//! Moduli below [`MIN_MODULUS_BITS`] are refused.

use crate::CryptoError;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::pss::{BlindedSigningKey, VerifyingKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;

/// Smallest accepted RSA modulus.
pub const MIN_MODULUS_BITS: usize = 2048;

/// A parsed RSA public key together with its encodings.
#[derive(Clone)]
pub struct RsaPublicMaterial {
    key: RsaPublicKey,
    verifying_key: VerifyingKey<Sha256>,
    spki_der: Vec<u8>,
    pem: Vec<u8>,
}

impl RsaPublicMaterial {
    /// Parse a PEM public key. The original bytes are kept verbatim.
    pub fn from_pem(pem: &[u8]) -> Result<Self, CryptoError> {
        let text = std::str::from_utf8(pem)
            .map_err(|_| CryptoError::InvalidPublicKey("PEM is not UTF-8".to_string()))?
            .trim();

        let key = RsaPublicKey::from_public_key_pem(text)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(text))
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

        Self::build(key, pem.to_vec())
    }

    /// Wrap an already parsed key, encoding it as SPKI PEM.
    pub fn from_key(key: RsaPublicKey) -> Result<Self, CryptoError> {
        let pem = key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Self::build(key, pem.into_bytes())
    }

    fn build(key: RsaPublicKey, pem: Vec<u8>) -> Result<Self, CryptoError> {
        let bits = key.n().bits();
        if bits < MIN_MODULUS_BITS {
            return Err(CryptoError::InvalidPublicKey(format!(
                "modulus of {bits} bits is below the {MIN_MODULUS_BITS}-bit minimum"
            )));
        }

        let spki_der = key
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?
            .as_bytes()
            .to_vec();

        Ok(Self {
            verifying_key: VerifyingKey::new(key.clone()),
            key,
            spki_der,
            pem,
        })
    }

    /// The RSA public key.
    pub fn key(&self) -> &RsaPublicKey {
        &self.key
    }

    /// PSS-SHA256 verifier for this key.
    pub fn verifying_key(&self) -> &VerifyingKey<Sha256> {
        &self.verifying_key
    }

    /// DER-encoded SubjectPublicKeyInfo.
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// PEM bytes (as loaded, or SPKI PEM when built from a key).
    pub fn pem(&self) -> &[u8] {
        &self.pem
    }

    /// Modulus length in bytes, which is also the signature and OAEP block length.
    pub fn modulus_len(&self) -> usize {
        self.key.size()
    }
}

impl PartialEq for RsaPublicMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for RsaPublicMaterial {}

impl fmt::Debug for RsaPublicMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPublicMaterial")
            .field("bits", &self.key.n().bits())
            .finish_non_exhaustive()
    }
}

/// An actor's RSA key pair.
pub struct RsaKeyPair {
    private_key: RsaPrivateKey,
    signing_key: BlindedSigningKey<Sha256>,
    public: RsaPublicMaterial,
}

impl RsaKeyPair {
    /// Load a key pair from PEM files' contents.
    ///
    /// # Errors
    ///
    /// Fails when either half does not parse, or when the public key does not
    /// belong to the private key.
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, CryptoError> {
        let text = std::str::from_utf8(private_pem)
            .map_err(|_| CryptoError::InvalidPrivateKey("PEM is not UTF-8".to_string()))?
            .trim();

        let private_key = RsaPrivateKey::from_pkcs8_pem(text)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(text))
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;

        let public = RsaPublicMaterial::from_pem(public_pem)?;
        if private_key.to_public_key() != *public.key() {
            return Err(CryptoError::InvalidPrivateKey(
                "private key does not match the public key".to_string(),
            ));
        }

        Ok(Self::assemble(private_key, public))
    }

    fn assemble(private_key: RsaPrivateKey, public: RsaPublicMaterial) -> Self {
        Self {
            signing_key: BlindedSigningKey::new(private_key.clone()),
            private_key,
            public,
        }
    }

    /// The private half.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// PSS-SHA256 signer for this pair.
    pub fn signing_key(&self) -> &BlindedSigningKey<Sha256> {
        &self.signing_key
    }

    /// The public half.
    pub fn public(&self) -> &RsaPublicMaterial {
        &self.public
    }
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl RsaKeyPair {
    /// Generate a fresh key pair. Fixture use only.
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        let public = RsaPublicMaterial::from_key(private_key.to_public_key())?;
        Ok(Self::assemble(private_key, public))
    }

    /// PKCS#8 PEM of the private half. Fixture use only.
    pub fn private_key_pem(&self) -> Result<String, CryptoError> {
        use rsa::pkcs8::EncodePrivateKey;

        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
    }
}
