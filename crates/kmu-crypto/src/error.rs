//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Invalid magic bytes - not a protected key string.
    #[error("Invalid magic bytes - not a protected key")]
    InvalidMagic,

    /// Unsupported format version.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed - wrong key or corrupted data.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Password-protected material could not be opened.
    ///
    /// Wrong password and corrupted ciphertext are deliberately indistinguishable.
    #[error("Unable to open protected key material")]
    UnprotectFailed,

    /// A salt or nonce was empty, all-zero, or already used.
    #[error("Reused cryptographic material: {0}")]
    ReusedCryptographicMaterial(&'static str),

    /// Digest tag not present in the registry.
    #[error("Unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(String),

    /// Attached signature failed to open under the given public key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Key material was accessed after `self_destruct`.
    #[error("Key material used after destroy")]
    KeyUseAfterDestroy,

    /// Passphrase too short.
    #[error("Passphrase too short (minimum {0} characters required)")]
    PassphraseTooShort(usize),

    /// Invalid key bytes or size.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CryptoError::InvalidMagic;
        assert!(err.to_string().contains("magic bytes"));
    }

    #[test]
    fn test_unsupported_version_display() {
        let err = CryptoError::UnsupportedVersion(9);
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn test_unprotect_failed_is_generic() {
        let err = CryptoError::UnprotectFailed;
        let msg = err.to_string().to_lowercase();
        assert!(!msg.contains("password"));
        assert!(!msg.contains("tag"));
    }

    #[test]
    fn test_unknown_digest_display() {
        let err = CryptoError::UnknownDigestAlgorithm("MD4".into());
        assert!(err.to_string().contains("MD4"));
    }
}
