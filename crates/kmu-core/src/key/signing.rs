use rand::{CryptoRng, RngCore};

use kmu_crypto::sign::{SigningPublicKey, SigningSecretKey};
use kmu_crypto::{b64url_decode_array, b64url_encode, KeyBytes};

use super::{algorithm, KeyMetadata, KeyUsage};
use crate::block::{Block, BlockType};
use crate::error::{KmuError, KmuResult};
use crate::time::Clock;

/// Public signing key as published in a `-P` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKeyForPublication {
    pub metadata: KeyMetadata,
    pub public_key: SigningPublicKey,
}

impl SigningKeyForPublication {
    /// Read from a `-P` or `-U` block with `KeyUsage` = `Signing`.
    pub fn from_block(block: &Block) -> KmuResult<Self> {
        let metadata =
            KeyMetadata::from_block(block, &[BlockType::P, BlockType::U], KeyUsage::Signing)?;
        let public_key = SigningPublicKey::from_bytes(b64url_decode_array(block.require("P")?)?);
        Ok(Self {
            metadata,
            public_key,
        })
    }

    /// `KeyAlgorithm, KeyUsage, CreatedOn, P` under `<handle>-P`.
    pub fn to_block(&self) -> Block {
        self.metadata
            .to_block(BlockType::P, algorithm::SIGNING)
            .with("P", b64url_encode(self.public_key.as_bytes()))
    }

    pub fn handle(&self) -> &str {
        self.metadata.handle.as_str()
    }
}

/// Open signing keypair as held in a `-U` block.
#[derive(Debug, Clone)]
pub struct SigningKeyContents {
    pub public: SigningKeyForPublication,
    secret: KeyBytes,
}

impl SigningKeyContents {
    /// Generate a keypair with handle and creation time from the injected sources.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, clock: &dyn Clock) -> Self {
        let metadata = KeyMetadata::generate(rng, clock, KeyUsage::Signing);
        let secret = SigningSecretKey::generate(rng);
        Self {
            public: SigningKeyForPublication {
                metadata,
                public_key: secret.public_key(),
            },
            secret: KeyBytes::from_slice(secret.as_bytes()),
        }
    }

    /// Read from an open `-U` block carrying `S`.
    ///
    /// The embedded public half of `S` must agree with `P`.
    pub fn from_block(block: &Block) -> KmuResult<Self> {
        let metadata = KeyMetadata::from_block(block, &[BlockType::U], KeyUsage::Signing)?;
        let secret_bytes = kmu_crypto::b64url_decode(block.require("S")?)?;
        let secret = SigningSecretKey::from_keypair_bytes(&secret_bytes)?;
        let keys = KeyBytes::new(secret_bytes);

        let public_key = match block.get("P") {
            Some(p) => {
                let public_key = SigningPublicKey::from_bytes(b64url_decode_array(p)?);
                if public_key != secret.public_key() {
                    return Err(KmuError::invalid_block(
                        block.name(),
                        "P does not match the secret key",
                    ));
                }
                public_key
            }
            None => secret.public_key(),
        };

        Ok(Self {
            public: SigningKeyForPublication {
                metadata,
                public_key,
            },
            secret: keys,
        })
    }

    /// Full open block: the publication entries plus `S`, named `<handle>-U`.
    pub fn to_block(&self) -> KmuResult<Block> {
        let secret = self.secret.bytes()?;
        Ok(self
            .public
            .to_block()
            .retyped(BlockType::U)
            .with("S", b64url_encode(secret)))
    }

    /// Publication block without the secret.
    pub fn pub_block(&self) -> Block {
        self.public.to_block()
    }

    pub fn handle(&self) -> &str {
        self.public.handle()
    }

    /// Secret key for signing; fails after [`SigningKeyContents::self_destruct`].
    pub fn secret_key(&self) -> KmuResult<SigningSecretKey> {
        Ok(SigningSecretKey::from_keypair_bytes(self.secret.bytes()?)?)
    }

    /// Zero the secret bytes.
    pub fn self_destruct(&mut self) {
        self.secret.self_destruct();
    }

    pub fn is_alive(&self) -> bool {
        self.secret.is_alive()
    }
}
