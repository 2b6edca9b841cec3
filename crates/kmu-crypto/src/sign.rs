//! Ed25519 attached signatures.
//!
//! An attached signature is the 64-byte signature followed by the message
//! itself. Opening checks the signature and hands back the embedded message,
//! which the caller then compares against its own recomputation.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Public half of a signing keypair (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SigningPublicKey([u8; 32]);

impl SigningPublicKey {
    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn to_dalek(self) -> CryptoResult<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid Ed25519 public key: {}", e)))
    }
}

impl std::fmt::Debug for SigningPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningPublicKey({:02x?})", &self.0[..8])
    }
}

/// Secret signing key stored as the 64-byte keypair encoding (seed followed by public key).
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningSecretKey([u8; 64]);

impl SigningSecretKey {
    /// Generate a new key from the supplied generator.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let key = SigningKey::generate(rng);
        Self(key.to_keypair_bytes())
    }

    /// Rebuild from the 64-byte keypair encoding; the embedded public half must match.
    pub fn from_keypair_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("Expected 64 bytes, got {}", bytes.len()))
        })?;
        SigningKey::from_keypair_bytes(&arr)
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid Ed25519 keypair: {}", e)))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> SigningPublicKey {
        let mut public = [0u8; 32];
        public.copy_from_slice(&self.0[32..]);
        SigningPublicKey(public)
    }

    fn to_dalek(&self) -> CryptoResult<SigningKey> {
        SigningKey::from_keypair_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid Ed25519 keypair: {}", e)))
    }
}

impl std::fmt::Debug for SigningSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecretKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Sign `message`, returning `signature || message`.
pub fn sign_attached(secret: &SigningSecretKey, message: &[u8]) -> CryptoResult<Vec<u8>> {
    let key = secret.to_dalek()?;
    let signature = key.sign(message);

    let mut out = Vec::with_capacity(SIGNATURE_LEN + message.len());
    out.extend_from_slice(&signature.to_bytes());
    out.extend_from_slice(message);
    Ok(out)
}

/// Verify an attached signature and return the embedded message.
pub fn open_attached(public: &SigningPublicKey, signed: &[u8]) -> CryptoResult<Vec<u8>> {
    if signed.len() < SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignature);
    }
    let (sig_bytes, message) = signed.split_at(SIGNATURE_LEN);
    let sig_arr: [u8; SIGNATURE_LEN] = sig_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;

    let key = public.to_dalek().map_err(|_| CryptoError::InvalidSignature)?;
    key.verify(message, &Signature::from_bytes(&sig_arr))
        .map_err(|_| CryptoError::InvalidSignature)?;

    Ok(message.to_vec())
}
