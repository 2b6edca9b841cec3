use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use kmu_crypto::cipher::generate_random;
use kmu_crypto::{b64url_decode, b64url_encode, KeyBytes};

use super::{algorithm, KeyMetadata, KeyUsage};
use crate::block::{Block, BlockType};
use crate::error::{KmuError, KmuResult};
use crate::time::Clock;

const SECRET_BOX_KEY_LEN: usize = 32;

/// Symmetric key held in a `-U` block. There is no public half, so no `P` entry.
#[derive(Debug, Clone)]
pub struct SecretBoxKeyContents {
    pub metadata: KeyMetadata,
    secret: KeyBytes,
}

impl SecretBoxKeyContents {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, clock: &dyn Clock) -> Self {
        let metadata = KeyMetadata::generate(rng, clock, KeyUsage::SecretBox);
        let bytes: Zeroizing<[u8; SECRET_BOX_KEY_LEN]> = Zeroizing::new(generate_random(rng));
        Self {
            metadata,
            secret: KeyBytes::from_slice(bytes.as_slice()),
        }
    }

    pub fn from_block(block: &Block) -> KmuResult<Self> {
        let metadata = KeyMetadata::from_block(block, &[BlockType::U], KeyUsage::SecretBox)?;
        let bytes = Zeroizing::new(b64url_decode(block.require("S")?)?);
        if bytes.len() != SECRET_BOX_KEY_LEN {
            return Err(KmuError::invalid_block(
                block.name(),
                format!("secret box key must be {} bytes", SECRET_BOX_KEY_LEN),
            ));
        }
        Ok(Self {
            metadata,
            secret: KeyBytes::from_slice(&bytes),
        })
    }

    /// `KeyAlgorithm, KeyUsage, CreatedOn, S` under `<handle>-U`.
    pub fn to_block(&self) -> KmuResult<Block> {
        Ok(self
            .metadata
            .to_block(BlockType::U, algorithm::SECRET_BOX)
            .with("S", b64url_encode(self.secret.bytes()?)))
    }

    pub fn handle(&self) -> &str {
        self.metadata.handle.as_str()
    }

    /// Copy of the key, wiped when dropped.
    pub fn key_bytes(&self) -> KmuResult<Zeroizing<[u8; SECRET_BOX_KEY_LEN]>> {
        Ok(Zeroizing::new(self.secret.to_array()?))
    }

    pub fn self_destruct(&mut self) {
        self.secret.self_destruct();
    }
}
