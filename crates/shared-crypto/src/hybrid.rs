//! # Hybrid Sealing
//!
//! Two sealing directions built from RSA and AES-256-GCM. Both produce a
//! [`Sealed`] pair whose `body` and `wrapped_key` only open together.
//!
//! ## Signed (one-to-many, authenticity)
//!
//! ```text
//! seed        ← random 32 bytes
//! K           ← HKDF-SHA256(ikm = seed, salt = SPKI(sender), info = REQUEST_KEY_INFO)
//! body        ← nonce || AES-256-GCM(K, nonce, plaintext, aad)
//! signature   ← RSASSA-PSS-SHA256(sender, DOMAIN || seed || H(aad) || H(body))
//! wrapped_key ← seed || signature
//! ```
//!
//! Opening requires the sender's public key twice: to verify the signature
//! and as HKDF salt. Only the private-key holder can produce a wrapped key
//! that verifies; anyone holding the public key can read the body.
//!
//! ## Sealed-for (one-to-one, confidentiality)
//!
//! ```text
//! K           ← random 32 bytes
//! body        ← nonce || AES-256-GCM(K, nonce, plaintext, aad)
//! wrapped_key ← RSA-OAEP-SHA256(recipient, K)
//! ```

use crate::keys::{RsaKeyPair, RsaPublicMaterial};
use crate::symmetric::{self, SecretKey, KEY_LEN};
use crate::CryptoError;
use hkdf::Hkdf;
use rsa::pss::Signature;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::Oaep;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// HKDF info for signed-direction content keys.
pub const REQUEST_KEY_INFO: &[u8] = b"fabric-guard/request-key/v1";

/// Domain separation prefix of the signed message.
const SIGNATURE_DOMAIN: &[u8] = b"fabric-guard/request-signature/v1";

/// Length of the random seed leading a signed wrapped key.
pub const SEED_LEN: usize = 32;

/// Ciphertext and the key material needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Framed AES-256-GCM ciphertext.
    pub body: Vec<u8>,
    /// Signed seed or OAEP-wrapped content key.
    pub wrapped_key: Vec<u8>,
}

// =============================================================================
// SIGNED DIRECTION
// =============================================================================

/// Seal `plaintext` so that any holder of `signer`'s public key can open it
/// and be sure `signer` produced it.
pub fn seal_signed(signer: &RsaKeyPair, plaintext: &[u8], aad: &[u8]) -> Result<Sealed, CryptoError> {
    let mut seed = Zeroizing::new([0u8; SEED_LEN]);
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut seed[..]);

    let key = derive_request_key(&seed[..], signer.public().spki_der())?;
    let body = symmetric::seal(&key, plaintext, aad)?;

    let signature: Signature = signer
        .signing_key()
        .try_sign_with_rng(&mut rand::thread_rng(), &signed_message(&seed[..], aad, &body))
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let signature = signature.to_vec();
    let mut wrapped_key = Vec::with_capacity(SEED_LEN + signature.len());
    wrapped_key.extend_from_slice(&seed[..]);
    wrapped_key.extend_from_slice(&signature);

    Ok(Sealed { body, wrapped_key })
}

/// Open a [`seal_signed`] pair with the claimed sender's public key.
///
/// # Errors
///
/// `CryptoError::SignatureVerificationFailed` when the wrapped key was not
/// produced by the matching private key (or was altered), and
/// `CryptoError::DecryptionFailed` when the body does not authenticate.
pub fn open_signed(
    sender: &RsaPublicMaterial,
    body: &[u8],
    wrapped_key: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if wrapped_key.len() != SEED_LEN + sender.modulus_len() {
        return Err(CryptoError::SignatureVerificationFailed);
    }
    let (seed, signature) = wrapped_key.split_at(SEED_LEN);

    let signature =
        Signature::try_from(signature).map_err(|_| CryptoError::SignatureVerificationFailed)?;
    sender
        .verifying_key()
        .verify(&signed_message(seed, aad, body), &signature)
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;

    let key = derive_request_key(seed, sender.spki_der())?;
    symmetric::open(&key, body, aad)
}

fn derive_request_key(seed: &[u8], sender_spki: &[u8]) -> Result<SecretKey, CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(Some(sender_spki), seed);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hkdf.expand(REQUEST_KEY_INFO, &mut okm[..])
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(SecretKey::from_bytes(*okm))
}

fn signed_message(seed: &[u8], aad: &[u8], body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(SIGNATURE_DOMAIN.len() + seed.len() + 64);
    message.extend_from_slice(SIGNATURE_DOMAIN);
    message.extend_from_slice(seed);
    message.extend_from_slice(&Sha256::digest(aad));
    message.extend_from_slice(&Sha256::digest(body));
    message
}

// =============================================================================
// SEALED-FOR DIRECTION
// =============================================================================

/// Seal `plaintext` so that only `recipient`'s private key can open it.
pub fn seal_for(
    recipient: &RsaPublicMaterial,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Sealed, CryptoError> {
    let key = SecretKey::generate();
    let body = symmetric::seal(&key, plaintext, aad)?;

    let wrapped_key = recipient
        .key()
        .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(Sealed { body, wrapped_key })
}

/// Open a [`seal_for`] pair with the recipient's own key pair.
pub fn open_sealed(
    recipient: &RsaKeyPair,
    body: &[u8],
    wrapped_key: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let key_bytes = Zeroizing::new(
        recipient
            .private_key()
            .decrypt_blinded(&mut rand::thread_rng(), Oaep::new::<Sha256>(), wrapped_key)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?,
    );
    let key = SecretKey::from_slice(&key_bytes)?;
    symmetric::open(&key, body, aad)
}
