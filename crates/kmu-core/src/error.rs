//! Error types for container, signature and protection operations.

use kmu_crypto::CryptoError;
use thiserror::Error;

/// Errors raised by `kmu-core`.
///
/// Structural violations are raised where they happen; nothing here is
/// fatal to the process.
#[derive(Error, Debug)]
pub enum KmuError {
    /// Block name does not end in `-<Letter>` with a known letter.
    #[error("Unknown block type in name: {0}")]
    UnknownBlockType(String),

    /// A U or X block was placed in a transaction container.
    #[error("Block {0} may not appear in a transaction container")]
    IllegalBlockTypeForExport(String),

    /// Salt or nonce reuse detected while protecting keys.
    #[error("Reused cryptographic material: {0}")]
    ReusedCryptographicMaterial(String),

    /// Signer label was empty.
    #[error("SignedBy must not be empty")]
    EmptySignerLabel,

    /// No `-S` block in the verification set.
    #[error("No signature block found")]
    SignatureBlockNotFound,

    /// No matching `-P` signing key for the signature.
    #[error("No signing public key found for {0}")]
    SigningKeyNotFound(String),

    /// Digest tag not in the registry.
    #[error("Unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(String),

    /// A DataRefs token did not resolve in the scope.
    #[error("Missing scope value for reference: {0}")]
    MissingScopeValue(String),

    /// Signature did not verify or the recovered digest did not match.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Key material used after self-destruct.
    #[error("Key material used after destroy")]
    KeyUseAfterDestroy,

    /// Protected key could not be opened.
    #[error("Unable to open protected key material")]
    UnprotectFailed,

    /// A block lacks an entry required for the requested view.
    #[error("Block {block} is missing entry {key}")]
    MissingEntry { block: String, key: String },

    /// Block content is not what the typed view expects.
    #[error("Invalid block {block}: {reason}")]
    InvalidBlock { block: String, reason: String },

    /// Container version string not recognised.
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(String),

    /// Container JSON is well-formed but structurally wrong.
    #[error("Invalid container format: {0}")]
    InvalidFormat(String),

    /// Other primitive failures.
    #[error("Crypto error: {0}")]
    Crypto(CryptoError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KmuError {
    pub(crate) fn missing_entry(block: &str, key: &str) -> Self {
        Self::MissingEntry {
            block: block.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid_block(block: &str, reason: impl Into<String>) -> Self {
        Self::InvalidBlock {
            block: block.to_string(),
            reason: reason.into(),
        }
    }
}

/// Primitive errors that belong to the container taxonomy are lifted into
/// their own kinds; the rest stay wrapped.
impl From<CryptoError> for KmuError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UnprotectFailed => Self::UnprotectFailed,
            CryptoError::InvalidSignature => Self::InvalidSignature,
            CryptoError::KeyUseAfterDestroy => Self::KeyUseAfterDestroy,
            CryptoError::UnknownDigestAlgorithm(tag) => Self::UnknownDigestAlgorithm(tag),
            CryptoError::ReusedCryptographicMaterial(what) => {
                Self::ReusedCryptographicMaterial(what.to_string())
            }
            other => Self::Crypto(other),
        }
    }
}

/// Result type for `kmu-core` operations.
pub type KmuResult<T> = Result<T, KmuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_errors_lift_into_taxonomy() {
        assert!(matches!(
            KmuError::from(CryptoError::UnprotectFailed),
            KmuError::UnprotectFailed
        ));
        assert!(matches!(
            KmuError::from(CryptoError::UnknownDigestAlgorithm("X".into())),
            KmuError::UnknownDigestAlgorithm(ref t) if t == "X"
        ));
        assert!(matches!(
            KmuError::from(CryptoError::ReusedCryptographicMaterial("salt already used")),
            KmuError::ReusedCryptographicMaterial(_)
        ));
    }

    #[test]
    fn test_other_crypto_errors_stay_wrapped() {
        let err = KmuError::from(CryptoError::InvalidKey("bad".into()));
        assert!(matches!(err, KmuError::Crypto(_)));
    }

    #[test]
    fn test_missing_entry_display() {
        let err = KmuError::missing_entry("abc-P", "KeyUsage");
        let msg = err.to_string();
        assert!(msg.contains("abc-P"));
        assert!(msg.contains("KeyUsage"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: KmuError = io_err.into();
        assert!(matches!(err, KmuError::Io(_)));
    }
}
