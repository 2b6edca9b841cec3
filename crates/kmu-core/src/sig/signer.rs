use std::time::Instant;

use rand::{CryptoRng, RngCore};
use tracing::{debug, info, trace};

use kmu_crypto::sign::sign_attached;
use kmu_crypto::{b64url_encode, DigestAlgorithm, StreamingDigest};

use super::signature::{entry, Signature, SignatureMetadata};
use crate::block::Block;
use crate::error::{KmuError, KmuResult};
use crate::handle::Handle;
use crate::key::SigningKeyContents;
use crate::kmu::Kmu;
use crate::logging::subsystem;
use crate::time::{now_string, Clock, SystemClock};

/// Builds a canonical signature over an ordered set of blocks.
///
/// Hashing order is: the signature's own `CreatedOn`, `SignedBy` and
/// `SignedWith` values, then every entry value of every block in the order
/// the blocks were added. Only values are hashed; the names travel in the
/// `DataRefs` tokens so a verifier can replay the same order.
pub struct CanonicalSigner<'a> {
    signed_by: String,
    key: &'a SigningKeyContents,
    digest: DigestAlgorithm,
    blocks: Vec<Block>,
}

impl<'a> CanonicalSigner<'a> {
    /// Signer with the default digest. `signed_by` must not be empty.
    pub fn new(signed_by: impl Into<String>, key: &'a SigningKeyContents) -> KmuResult<Self> {
        let signed_by = signed_by.into();
        if signed_by.trim().is_empty() {
            return Err(KmuError::EmptySignerLabel);
        }
        Ok(Self {
            signed_by,
            key,
            digest: DigestAlgorithm::default(),
            blocks: Vec::new(),
        })
    }

    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    pub fn add_block(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    /// Queue every block of `kmu` in container order.
    pub fn add_kmu_blocks(&mut self, kmu: &Kmu) -> &mut Self {
        self.blocks.extend(kmu.blocks().cloned());
        self
    }

    /// Sign using the OS generator and the system clock.
    pub fn sign(&self) -> KmuResult<Signature> {
        self.sign_with(&mut rand::thread_rng(), &SystemClock)
    }

    /// Sign with an injected generator (for the signature handle) and clock.
    pub fn sign_with<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        clock: &dyn Clock,
    ) -> KmuResult<Signature> {
        let start = Instant::now();
        let secret = self.key.secret_key()?;

        let metadata = SignatureMetadata {
            handle: Handle::random(rng),
            created_on: now_string(clock),
            digest_algorithm: self.digest.tag().to_string(),
            signed_with: self.key.handle().to_string(),
            signed_by: self.signed_by.clone(),
        };
        debug!(
            subsystem = subsystem::SIGNATURE,
            digest_alg = %self.digest,
            signed_with = %metadata.signed_with,
            block_count = self.blocks.len(),
            "Starting canonical digest"
        );

        let mut hasher = self.digest.hasher();
        let mut tokens = Vec::new();

        let sig_name = metadata.block_name();
        feed(
            hasher.as_mut(),
            &mut tokens,
            &sig_name,
            [
                (entry::CREATED_ON, metadata.created_on.as_str()),
                (entry::SIGNED_BY, metadata.signed_by.as_str()),
                (entry::SIGNED_WITH, metadata.signed_with.as_str()),
            ],
        );

        for block in &self.blocks {
            trace!(block = block.name(), entries = block.len(), "Hashing block");
            feed(hasher.as_mut(), &mut tokens, block.name(), block.entries());
        }

        let hash = hasher.finalize();
        let signed = sign_attached(&secret, &hash)?;

        let signature = Signature {
            metadata,
            signature: b64url_encode(signed),
            data_refs: tokens,
        };
        info!(
            subsystem = subsystem::SIGNATURE,
            op = "sign",
            signature = %signature.metadata.handle,
            token_count = signature.data_refs.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Signature created"
        );
        Ok(signature)
    }
}

/// Hash the values of one block and record `name:first`, `.next`, ... tokens.
fn feed<'e>(
    hasher: &mut dyn StreamingDigest,
    tokens: &mut Vec<String>,
    block_name: &str,
    entries: impl IntoIterator<Item = (&'e str, &'e str)>,
) {
    for (index, (key, value)) in entries.into_iter().enumerate() {
        if index == 0 {
            tokens.push(format!("{}:{}", block_name, key));
        } else {
            tokens.push(format!(".{}", key));
        }
        hasher.update(value.as_bytes());
    }
}
