use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use kmu_crypto::sign::{open_attached, SigningPublicKey};
use kmu_crypto::{b64url_decode, b64url_decode_array, DigestAlgorithm};

use super::signature::Signature;
use crate::block::{Block, BlockType};
use crate::error::{KmuError, KmuResult};
use crate::key::KeyUsage;
use crate::kmu::Kmu;
use crate::logging::subsystem;

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSignature {
    /// Name of the `-S` block that was checked.
    pub signature_block: String,
    pub signed_by: String,
    pub signed_with: String,
    /// Name of the `-P` block whose key opened the signature.
    pub key_block: String,
    pub digest: DigestAlgorithm,
    pub created_on: String,
    /// Number of DataRefs tokens replayed.
    pub token_count: usize,
}

/// Verify the first signature found in `kmu`.
pub fn verify(kmu: &Kmu) -> KmuResult<VerifiedSignature> {
    verify_blocks(kmu.blocks())
}

/// Verify the first `-S` block in `blocks` against the rest of the set.
///
/// The scope is built from every block, the signature block included, so
/// blocks that no DataRefs token names may change freely.
pub fn verify_blocks<'a, I>(blocks: I) -> KmuResult<VerifiedSignature>
where
    I: IntoIterator<Item = &'a Block>,
{
    let start = Instant::now();
    let blocks: Vec<&Block> = blocks.into_iter().collect();

    let sig_block = blocks
        .iter()
        .find(|b| b.is_signature())
        .ok_or(KmuError::SignatureBlockNotFound)?;
    let signature = Signature::from_block(sig_block)?;
    let signed_with = signature.metadata.signed_with.as_str();

    let key_block = blocks
        .iter()
        .find(|b| {
            b.block_type() == BlockType::P
                && b.name().starts_with(signed_with)
                && b.key_usage() == Some(KeyUsage::Signing)
        })
        .ok_or_else(|| KmuError::SigningKeyNotFound(signed_with.to_string()))?;
    let public_key = SigningPublicKey::from_bytes(b64url_decode_array(key_block.require("P")?)?);
    debug!(
        subsystem = subsystem::SIGNATURE,
        signature = sig_block.name(),
        key_block = key_block.name(),
        "Signing key located"
    );

    let digest = DigestAlgorithm::from_tag(&signature.metadata.digest_algorithm)?;
    debug!(subsystem = subsystem::SIGNATURE, digest_alg = %digest, "Digest selected");

    let mut scope = HashMap::new();
    for block in &blocks {
        block.load_into_scope(&mut scope);
    }

    let mut hasher = digest.hasher();
    let mut identity: Option<&str> = None;
    for token in &signature.data_refs {
        let key = match token.strip_prefix('.') {
            Some(rest) => {
                let id = identity.ok_or_else(|| KmuError::MissingScopeValue(token.clone()))?;
                format!("{}:{}", id, rest)
            }
            None => {
                identity = token.split_once(':').map(|(id, _)| id);
                token.clone()
            }
        };
        trace!(token = %key, "Replaying reference");
        let value = scope
            .get(&key)
            .ok_or_else(|| KmuError::MissingScopeValue(key.clone()))?;
        hasher.update(value.as_bytes());
    }
    let hash = hasher.finalize();

    let signed = b64url_decode(&signature.signature).map_err(|_| KmuError::InvalidSignature)?;
    let recovered = open_attached(&public_key, &signed)?;
    if recovered != hash {
        warn!(
            subsystem = subsystem::SIGNATURE,
            op = "verify",
            signature = sig_block.name(),
            "Recovered digest does not match replayed digest"
        );
        return Err(KmuError::InvalidSignature);
    }

    info!(
        subsystem = subsystem::SIGNATURE,
        op = "verify",
        signature = sig_block.name(),
        signed_with = signed_with,
        token_count = signature.data_refs.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Signature verified"
    );

    Ok(VerifiedSignature {
        signature_block: sig_block.name().to_string(),
        signed_by: signature.metadata.signed_by.clone(),
        signed_with: signed_with.to_string(),
        key_block: key_block.name().to_string(),
        digest,
        created_on: signature.metadata.created_on.clone(),
        token_count: signature.data_refs.len(),
    })
}
