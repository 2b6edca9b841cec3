//! Digest registry used by signatures.
//!
//! A signature names its digest by a string tag. Tags resolve through
//! [`DigestAlgorithm::from_tag`]; anything unrecognised is an error rather
//! than a silent fallback.

use std::fmt;
use std::str::FromStr;

use sha3::Digest;

use crate::cubehash::CubeHash;
use crate::error::{CryptoError, CryptoResult};

/// Tag written when the caller does not choose a digest.
pub const DEFAULT_DIGEST_TAG: &str = "CubeHash-256";

/// Incremental hash with a runtime-selected algorithm.
pub trait StreamingDigest: Send {
    /// Absorb more input.
    fn update(&mut self, data: &[u8]);

    /// Consume the hasher and return the digest bytes.
    fn finalize(self: Box<Self>) -> Vec<u8>;

    /// Digest length in bytes.
    fn output_len(&self) -> usize;
}

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    CubeHash224,
    CubeHash256,
    CubeHash384,
    CubeHash512,
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        Self::CubeHash256
    }
}

impl DigestAlgorithm {
    /// All registered algorithms.
    pub const ALL: [DigestAlgorithm; 8] = [
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
        Self::CubeHash224,
        Self::CubeHash256,
        Self::CubeHash384,
        Self::CubeHash512,
    ];

    /// Canonical tag written into signature blocks.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Sha3_224 => "SHA3-224",
            Self::Sha3_256 => "SHA3-256",
            Self::Sha3_384 => "SHA3-384",
            Self::Sha3_512 => "SHA3-512",
            Self::CubeHash224 => "CubeHash-224",
            Self::CubeHash256 => "CubeHash-256",
            Self::CubeHash384 => "CubeHash-384",
            Self::CubeHash512 => "CubeHash-512",
        }
    }

    /// Resolve a tag.
    ///
    /// CubeHash tags are accepted with or without the hyphen. The bare
    /// `SHA3` tag resolves to SHA3-256. Other SHA families are not SHA-3 and
    /// are rejected.
    pub fn from_tag(tag: &str) -> CryptoResult<Self> {
        let tag = tag.trim();
        let algorithm = match tag {
            "CubeHash-224" | "CubeHash224" => Self::CubeHash224,
            "CubeHash-256" | "CubeHash256" => Self::CubeHash256,
            "CubeHash-384" | "CubeHash384" => Self::CubeHash384,
            "CubeHash-512" | "CubeHash512" => Self::CubeHash512,
            "SHA3-224" => Self::Sha3_224,
            "SHA3" | "SHA3-256" => Self::Sha3_256,
            "SHA3-384" => Self::Sha3_384,
            "SHA3-512" => Self::Sha3_512,
            other => return Err(CryptoError::UnknownDigestAlgorithm(other.to_string())),
        };
        Ok(algorithm)
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha3_224 | Self::CubeHash224 => 28,
            Self::Sha3_256 | Self::CubeHash256 => 32,
            Self::Sha3_384 | Self::CubeHash384 => 48,
            Self::Sha3_512 | Self::CubeHash512 => 64,
        }
    }

    /// Start a new streaming digest.
    pub fn hasher(&self) -> Box<dyn StreamingDigest> {
        match self {
            Self::Sha3_224 => Box::new(Sha3Stream(sha3::Sha3_224::new())),
            Self::Sha3_256 => Box::new(Sha3Stream(sha3::Sha3_256::new())),
            Self::Sha3_384 => Box::new(Sha3Stream(sha3::Sha3_384::new())),
            Self::Sha3_512 => Box::new(Sha3Stream(sha3::Sha3_512::new())),
            Self::CubeHash224 => Box::new(CubeHash::new(224)),
            Self::CubeHash256 => Box::new(CubeHash::new(256)),
            Self::CubeHash384 => Box::new(CubeHash::new(384)),
            Self::CubeHash512 => Box::new(CubeHash::new(512)),
        }
    }

    /// One-shot digest of a byte slice.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

struct Sha3Stream<D>(D);

impl<D> StreamingDigest for Sha3Stream<D>
where
    D: Digest + Send,
{
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }

    fn output_len(&self) -> usize {
        <D as Digest>::output_size()
    }
}

impl StreamingDigest for CubeHash {
    fn update(&mut self, data: &[u8]) {
        CubeHash::update(self, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        CubeHash::finalize(*self)
    }

    fn output_len(&self) -> usize {
        CubeHash::output_len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_cubehash_256() {
        assert_eq!(DigestAlgorithm::default().tag(), DEFAULT_DIGEST_TAG);
        assert_eq!(
            DigestAlgorithm::from_tag(DEFAULT_DIGEST_TAG).unwrap(),
            DigestAlgorithm::CubeHash256
        );
    }

    #[test]
    fn test_tags_roundtrip() {
        for alg in DigestAlgorithm::ALL {
            assert_eq!(DigestAlgorithm::from_tag(alg.tag()).unwrap(), alg);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            DigestAlgorithm::from_tag("CubeHash512").unwrap(),
            DigestAlgorithm::CubeHash512
        );
        assert_eq!(
            DigestAlgorithm::from_tag("SHA3").unwrap(),
            DigestAlgorithm::Sha3_256
        );
    }

    #[test]
    fn test_unknown_tag() {
        let result = DigestAlgorithm::from_tag("MD5");
        assert!(matches!(
            result,
            Err(CryptoError::UnknownDigestAlgorithm(ref t)) if t == "MD5"
        ));
    }

    #[test]
    fn test_other_sha_families_rejected() {
        for tag in ["SHA-1", "SHA-256", "SHA512", "SHA3-1024"] {
            assert!(
                matches!(
                    DigestAlgorithm::from_tag(tag),
                    Err(CryptoError::UnknownDigestAlgorithm(_))
                ),
                "{} should not resolve",
                tag
            );
        }
    }

    #[test]
    fn test_sha3_256_known_answer() {
        let out = DigestAlgorithm::Sha3_256.digest(b"");
        assert_eq!(
            hex::encode(out),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_output_lengths_match_hashers() {
        for alg in DigestAlgorithm::ALL {
            let hasher = alg.hasher();
            assert_eq!(hasher.output_len(), alg.output_len());
            assert_eq!(alg.digest(b"abc").len(), alg.output_len());
        }
    }

    #[test]
    fn test_streaming_equals_one_shot() {
        for alg in DigestAlgorithm::ALL {
            let mut hasher = alg.hasher();
            hasher.update(b"Created");
            hasher.update(b"On");
            assert_eq!(hasher.finalize(), alg.digest(b"CreatedOn"));
        }
    }
}
