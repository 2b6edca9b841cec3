//! Password-based protection of key material.
//!
//! Secret key bytes are sealed with AES-256-GCM under a key derived from a
//! password with Argon2id. The result is a single base64url string suitable
//! for a block entry.
//!
//! # Format
//!
//! ```text
//! +------------------+
//! | Magic: "kx"      | 2 bytes
//! +------------------+
//! | Version          | 1 byte
//! +------------------+
//! | memory_kib       | 4 bytes (little-endian)
//! | iterations       | 4 bytes (little-endian)
//! | parallelism      | 4 bytes (little-endian)
//! +------------------+
//! | Salt             | 32 bytes
//! +------------------+
//! | Nonce            | 12 bytes
//! +------------------+
//! | Ciphertext       | Variable (plaintext + 16-byte auth tag)
//! +------------------+
//! ```
//!
//! Every salt and nonce is single-use. Opening never reports why it failed:
//! a wrong password and a damaged string both produce
//! [`CryptoError::UnprotectFailed`].

use std::collections::HashSet;

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::cipher::{
    aes_gcm_decrypt, aes_gcm_encrypt, generate_nonce, generate_salt, NONCE_LEN, TAG_LEN,
};
use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, KdfParams, Password};

/// Magic bytes for a protected key string.
pub const PBE_MAGIC: &[u8; 2] = b"kx";

/// Current format version.
pub const PBE_VERSION: u8 = 1;

const SALT_LEN: usize = 32;
const HEADER_LEN: usize = 2 + 1 + 12 + SALT_LEN + NONCE_LEN;

/// One set of salt, nonce and KDF cost for a single protect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbeParams {
    kdf: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
}

impl PbeParams {
    /// Draw a fresh salt and nonce.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, kdf: KdfParams) -> Self {
        Self {
            kdf,
            salt: generate_salt(rng),
            nonce: generate_nonce(rng),
        }
    }

    /// Build parameters from explicit material.
    pub fn from_parts(kdf: KdfParams, salt: [u8; SALT_LEN], nonce: [u8; NONCE_LEN]) -> Self {
        Self { kdf, salt, nonce }
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    fn check_not_blank(&self) -> CryptoResult<()> {
        if self.salt.iter().all(|b| *b == 0) {
            return Err(CryptoError::ReusedCryptographicMaterial("salt is all zero"));
        }
        if self.nonce.iter().all(|b| *b == 0) {
            return Err(CryptoError::ReusedCryptographicMaterial("nonce is all zero"));
        }
        Ok(())
    }
}

/// Records every salt and nonce consumed in a batch and refuses repeats.
#[derive(Debug, Default)]
pub struct SingleUseGuard {
    salts: HashSet<[u8; SALT_LEN]>,
    nonces: HashSet<[u8; NONCE_LEN]>,
}

impl SingleUseGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the parameters as consumed.
    pub fn consume(&mut self, params: &PbeParams) -> CryptoResult<()> {
        params.check_not_blank()?;
        if self.salts.contains(&params.salt) {
            return Err(CryptoError::ReusedCryptographicMaterial("salt already used"));
        }
        if self.nonces.contains(&params.nonce) {
            return Err(CryptoError::ReusedCryptographicMaterial("nonce already used"));
        }
        self.salts.insert(params.salt);
        self.nonces.insert(params.nonce);
        Ok(())
    }

    /// Number of parameter sets consumed so far.
    pub fn len(&self) -> usize {
        self.salts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.salts.is_empty()
    }
}

/// Seal `plaintext` under `password`, returning the base64url PBE string.
pub fn protect(params: &PbeParams, password: &Password, plaintext: &[u8]) -> CryptoResult<String> {
    params.check_not_blank()?;

    let derived = derive_key(password, &params.salt, &params.kdf)?;
    let ciphertext = aes_gcm_encrypt(derived.as_bytes(), &params.nonce, plaintext)?;

    let mut output = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    output.extend_from_slice(PBE_MAGIC);
    output.push(PBE_VERSION);
    output.extend_from_slice(&params.kdf.memory_kib.to_le_bytes());
    output.extend_from_slice(&params.kdf.iterations.to_le_bytes());
    output.extend_from_slice(&params.kdf.parallelism.to_le_bytes());
    output.extend_from_slice(&params.salt);
    output.extend_from_slice(&params.nonce);
    output.extend_from_slice(&ciphertext);

    Ok(b64url_encode(output))
}

/// Open a PBE string produced by [`protect`].
///
/// Every failure, including a malformed string, maps to
/// [`CryptoError::UnprotectFailed`].
pub fn unprotect(password: &Password, encoded: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let (params, ciphertext) = parse(encoded).map_err(|_| CryptoError::UnprotectFailed)?;

    let derived =
        derive_key(password, &params.salt, &params.kdf).map_err(|_| CryptoError::UnprotectFailed)?;

    aes_gcm_decrypt(derived.as_bytes(), &params.nonce, &ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::UnprotectFailed)
}

/// Check if a string looks like a PBE string (decodes and starts with the magic).
pub fn is_protected_string(encoded: &str) -> bool {
    b64url_decode(encoded)
        .map(|bytes| bytes.len() > HEADER_LEN && &bytes[0..2] == PBE_MAGIC)
        .unwrap_or(false)
}

fn parse(encoded: &str) -> CryptoResult<(PbeParams, Vec<u8>)> {
    let bytes = b64url_decode(encoded)?;

    if bytes.len() < HEADER_LEN + TAG_LEN {
        return Err(CryptoError::InvalidFormat("PBE string too short".to_string()));
    }
    if &bytes[0..2] != PBE_MAGIC {
        return Err(CryptoError::InvalidMagic);
    }
    if bytes[2] != PBE_VERSION {
        return Err(CryptoError::UnsupportedVersion(bytes[2]));
    }

    let read_u32 = |offset: usize| -> CryptoResult<u32> {
        bytes[offset..offset + 4]
            .try_into()
            .map(u32::from_le_bytes)
            .map_err(|_| CryptoError::InvalidFormat("Truncated KDF parameters".to_string()))
    };

    let kdf = KdfParams {
        memory_kib: read_u32(3)?,
        iterations: read_u32(7)?,
        parallelism: read_u32(11)?,
    };
    if kdf.exceeds_ceiling() {
        return Err(CryptoError::InvalidFormat(
            "KDF parameters above ceiling".to_string(),
        ));
    }

    let salt_start = 15;
    let nonce_start = salt_start + SALT_LEN;

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&bytes[salt_start..nonce_start]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&bytes[nonce_start..HEADER_LEN]);

    Ok((
        PbeParams::from_parts(kdf, salt, nonce),
        bytes[HEADER_LEN..].to_vec(),
    ))
}
