//! Authenticated public-key encryption between two X25519 keypairs.
//!
//! # Protocol
//!
//! 1. shared_secret = ECDH(sender_private, receiver_public)
//! 2. key = HKDF-SHA256(shared_secret, info = "kmu-box-v1")
//! 3. ciphertext = AES-256-GCM(key, nonce, plaintext)
//!
//! The receiver computes the same shared secret from its private key and the
//! sender's public key, so the box authenticates the sender as well.

use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::{aes_gcm_decrypt, aes_gcm_encrypt, NONCE_LEN};
use crate::error::{CryptoError, CryptoResult};

/// Domain separation context for HKDF.
const HKDF_INFO_BOX: &[u8] = b"kmu-box-v1";

/// X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BoxingPublicKey([u8; 32]);

impl BoxingPublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for BoxingPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoxingPublicKey({:02x?})", &self.0[..8])
    }
}

/// X25519 private key (32 bytes) with automatic zeroization.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct BoxingSecretKey([u8; 32]);

impl BoxingSecretKey {
    /// Generate a new private key from the supplied generator.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut secret_bytes = [0u8; 32];
        rng.fill_bytes(&mut secret_bytes);
        let secret = StaticSecret::from(secret_bytes);
        secret_bytes.zeroize();
        Self(secret.to_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> BoxingPublicKey {
        let secret = StaticSecret::from(self.0);
        BoxingPublicKey(*X25519Public::from(&secret).as_bytes())
    }
}

impl std::fmt::Debug for BoxingSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxingSecretKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Symmetric key derived from an X25519 exchange.
#[derive(Zeroize, ZeroizeOnDrop)]
struct BoxKey([u8; 32]);

fn derive_box_key(ours: &BoxingSecretKey, theirs: &BoxingPublicKey) -> CryptoResult<BoxKey> {
    let secret = StaticSecret::from(ours.0);
    let shared = secret.diffie_hellman(&X25519Public::from(theirs.0));
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKey(
            "Non-contributory X25519 public key".to_string(),
        ));
    }

    let hkdf = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut key = [0u8; 32];
    hkdf.expand(HKDF_INFO_BOX, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(BoxKey(key))
}

/// Encrypt `plaintext` from `sender` to `receiver`.
pub fn seal(
    sender: &BoxingSecretKey,
    receiver: &BoxingPublicKey,
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let key = derive_box_key(sender, receiver)?;
    aes_gcm_encrypt(&key.0, nonce, plaintext)
}

/// Decrypt a box produced by [`seal`].
pub fn open(
    receiver: &BoxingSecretKey,
    sender: &BoxingPublicKey,
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let key = derive_box_key(receiver, sender)?;
    aes_gcm_decrypt(&key.0, nonce, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let mut rng = rand::thread_rng();
        let alice = BoxingSecretKey::generate(&mut rng);
        let bob = BoxingSecretKey::generate(&mut rng);
        let nonce = [7u8; NONCE_LEN];

        let ct = seal(&alice, &bob.public_key(), &nonce, b"for bob").unwrap();
        let pt = open(&bob, &alice.public_key(), &nonce, &ct).unwrap();

        assert_eq!(pt, b"for bob");
    }

    #[test]
    fn test_open_wrong_receiver_fails() {
        let mut rng = rand::thread_rng();
        let alice = BoxingSecretKey::generate(&mut rng);
        let bob = BoxingSecretKey::generate(&mut rng);
        let carol = BoxingSecretKey::generate(&mut rng);
        let nonce = [7u8; NONCE_LEN];

        let ct = seal(&alice, &bob.public_key(), &nonce, b"for bob").unwrap();
        let result = open(&carol, &alice.public_key(), &nonce, &ct);

        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_low_order_public_key_rejected() {
        let alice = BoxingSecretKey::generate(&mut rand::thread_rng());
        let zero = BoxingPublicKey::from_bytes([0u8; 32]);

        let result = seal(&alice, &zero, &[1u8; NONCE_LEN], b"x");
        assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_public_key_deterministic() {
        let secret = BoxingSecretKey::from_bytes([9u8; 32]);
        assert_eq!(secret.public_key(), secret.public_key());
    }
}
