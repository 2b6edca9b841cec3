//! # kmu-crypto
//!
//! Cryptographic primitives for key material unit containers.
//!
//! Everything here is stateless apart from the caller-supplied random
//! generator. Container structure, signing scope and block bookkeeping live
//! in `kmu-core`.
//!
//! ## Cryptographic Primitives
//!
//! - **Signatures**: Ed25519, attached form (`signature || message`)
//! - **Digests**: SHA-3 (224/256/384/512) and CubeHash16/32 (224/256/384/512)
//! - **Key exchange**: X25519 with HKDF-SHA256
//! - **Symmetric cipher**: AES-256-GCM (AEAD)
//! - **Password protection**: Argon2id + AES-256-GCM, single-use salt and nonce
//! - **Text encoding**: base64url
//!
//! ## Examples
//!
//! ### Attached signature over a digest
//!
//! ```rust
//! use kmu_crypto::digest::DigestAlgorithm;
//! use kmu_crypto::sign::{open_attached, sign_attached, SigningSecretKey};
//!
//! let key = SigningSecretKey::generate(&mut rand::thread_rng());
//! let hash = DigestAlgorithm::default().digest(b"payload");
//!
//! let signed = sign_attached(&key, &hash).unwrap();
//! let recovered = open_attached(&key.public_key(), &signed).unwrap();
//! assert_eq!(recovered, hash);
//! ```
//!
//! ### Password protection
//!
//! ```rust
//! use kmu_crypto::kdf::{KdfParams, Password};
//! use kmu_crypto::pbe::{protect, unprotect, PbeParams};
//!
//! let kdf = KdfParams { memory_kib: 1024, iterations: 1, parallelism: 1 };
//! let params = PbeParams::generate(&mut rand::thread_rng(), kdf);
//! let password = Password::from("a long enough password");
//!
//! let sealed = protect(&params, &password, b"secret key").unwrap();
//! let opened = unprotect(&password, &sealed).unwrap();
//! assert_eq!(opened.as_slice(), b"secret key");
//! ```

pub mod boxing;
pub mod cipher;
pub mod cubehash;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod kdf;
pub mod key;
pub mod pbe;
pub mod sign;

pub use digest::{DigestAlgorithm, StreamingDigest, DEFAULT_DIGEST_TAG};
pub use encoding::{b64url_decode, b64url_decode_array, b64url_encode};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{KdfParams, Password, MIN_PASSPHRASE_LENGTH};
pub use key::KeyBytes;
pub use pbe::{PbeParams, SingleUseGuard};
