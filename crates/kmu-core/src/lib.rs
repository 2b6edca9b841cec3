//! # kmu-core
//!
//! Key material units: ordered containers of typed blocks, canonical
//! signatures that cover an exact selection of block entries, and
//! password protection for the private keys a container holds.
//!
//! ## Model
//!
//! - A [`Block`] is an ordered string map named `<handle>-<Letter>`, where
//!   the letter is its [`BlockType`].
//! - A [`Kmu`] is an ordered set of uniquely named blocks, either a keystore
//!   (may hold open `-U` and protected `-X` keys) or a transaction (may not).
//! - A signature is an `-S` block listing, as `DataRefs` tokens, every entry
//!   it covers. Entries it does not list may change without breaking it.
//!
//! ## Example
//!
//! ```rust
//! use kmu_core::{Block, BlockType, Kmu};
//! use kmu_core::key::SigningKeyContents;
//! use kmu_core::sig::{verify, CanonicalSigner};
//! use kmu_core::time::SystemClock;
//!
//! let key = SigningKeyContents::generate(&mut rand::thread_rng(), &SystemClock);
//!
//! let mut kmu = Kmu::transaction("admin@example.com");
//! kmu.add_block(key.pub_block()).unwrap();
//! kmu.add_block(Block::new(BlockType::D).with("greeting", "hello")).unwrap();
//!
//! let mut signer = CanonicalSigner::new("Chinese_Knees", &key).unwrap();
//! signer.add_kmu_blocks(&kmu);
//! kmu.add_block(signer.sign().unwrap().to_block()).unwrap();
//!
//! let verified = verify(&kmu).unwrap();
//! assert_eq!(verified.signed_by, "Chinese_Knees");
//! ```

pub mod block;
pub mod config;
pub mod envelope;
pub mod error;
pub mod format;
pub mod handle;
pub mod key;
pub mod kmu;
pub mod logging;
pub mod protect;
pub mod sig;
pub mod time;

pub use block::{Block, BlockType};
pub use config::{ConfigError, ConfigResult, KmuConfig};
pub use error::{KmuError, KmuResult};
pub use handle::Handle;
pub use key::KeyUsage;
pub use kmu::{Flavor, Kmu, KEYSTORE_VERSION, TRANSACTION_VERSION};
pub use sig::{CanonicalSigner, Signature, VerifiedSignature};
pub use time::{Clock, FixedClock, SystemClock};

// Re-exported so callers can build passwords and KDF settings without a
// direct dependency on the primitives crate.
pub use kmu_crypto::{DigestAlgorithm, KdfParams, Password};
