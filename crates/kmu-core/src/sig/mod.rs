//! Canonical signatures over ordered blocks.
//!
//! The signer hashes entry values in block order and records where each
//! value came from as a compact list of `DataRefs` tokens. The verifier
//! replays those tokens against whatever blocks it is given, so it never
//! needs to know how the signer assembled its input.

mod signature;
mod signer;
mod verifier;

pub use signature::{entry, split_data_refs, Signature, SignatureMetadata, DATA_REFS_SEPARATOR};
pub use signer::CanonicalSigner;
pub use verifier::{verify, verify_blocks, VerifiedSignature};
