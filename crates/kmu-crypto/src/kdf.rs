//! Password handling and key derivation using Argon2id.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Minimum passphrase length.
pub const MIN_PASSPHRASE_LENGTH: usize = 12;

/// Largest memory cost accepted, matching [`KdfParams::high_security`].
pub const MAX_MEMORY_KIB: u32 = 131072;

/// Largest iteration count accepted.
pub const MAX_ITERATIONS: u32 = 16;

/// Largest parallelism degree accepted.
pub const MAX_PARALLELISM: u32 = 16;

/// Argon2id parameters.
///
/// Derivation is intentionally slow; every protected key carries the
/// parameters it was sealed with so they can be raised over time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory in KiB (default: 65536 = 64 MiB).
    pub memory_kib: u32,
    /// Time iterations (default: 3).
    pub iterations: u32,
    /// Parallelism degree (default: 4).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Create low-memory parameters (for resource-constrained environments).
    pub fn low_memory() -> Self {
        Self {
            memory_kib: 32768, // 32 MiB
            iterations: 4,
            parallelism: 4,
        }
    }

    /// Create high-security parameters (for long-term keystores).
    pub fn high_security() -> Self {
        Self {
            memory_kib: 131072, // 128 MiB
            iterations: 4,
            parallelism: 4,
        }
    }

    /// True when any cost is above the accepted ceiling.
    ///
    /// Parameters travel inside protected strings, so they are checked
    /// before Argon2 allocates anything.
    pub fn exceeds_ceiling(&self) -> bool {
        self.memory_kib > MAX_MEMORY_KIB
            || self.iterations > MAX_ITERATIONS
            || self.parallelism > MAX_PARALLELISM
    }

    fn to_argon2(self) -> CryptoResult<Params> {
        if self.exceeds_ceiling() {
            return Err(CryptoError::KeyDerivation(format!(
                "KDF parameters above ceiling (memory_kib <= {}, iterations <= {}, parallelism <= {})",
                MAX_MEMORY_KIB, MAX_ITERATIONS, MAX_PARALLELISM
            )));
        }
        Params::new(self.memory_kib, self.iterations, self.parallelism, Some(32))
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
    }

    /// Check that Argon2 accepts these parameters and that they are within
    /// the ceiling.
    pub fn validate(&self) -> CryptoResult<()> {
        self.to_argon2().map(|_| ())
    }
}

/// Owned password bytes, wiped when dropped.
///
/// Operations take a `Password` by value so the bytes are gone on every
/// exit path, including early returns on error.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Password(Vec<u8>);

impl Password {
    /// Take ownership of the password text without copying it.
    pub fn new(password: String) -> Self {
        Self(password.into_bytes())
    }

    /// Wrap raw password bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[REDACTED]").finish()
    }
}

/// Key wrapper with automatic zeroization on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Create a new derived key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { key: bytes }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 256-bit key from a password using Argon2id.
pub fn derive_key(
    password: &Password,
    salt: &[u8; 32],
    params: &KdfParams,
) -> CryptoResult<DerivedKey> {
    validate_passphrase(password)?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey { key })
}

/// Validate passphrase strength.
pub fn validate_passphrase(password: &Password) -> CryptoResult<()> {
    if password.len() < MIN_PASSPHRASE_LENGTH {
        return Err(CryptoError::PassphraseTooShort(MIN_PASSPHRASE_LENGTH));
    }
    Ok(())
}
