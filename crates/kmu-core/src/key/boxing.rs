use rand::{CryptoRng, RngCore};

use kmu_crypto::boxing::{BoxingPublicKey, BoxingSecretKey};
use kmu_crypto::{b64url_decode_array, b64url_encode, KeyBytes};

use super::{algorithm, KeyMetadata, KeyUsage};
use crate::block::{Block, BlockType};
use crate::error::{KmuError, KmuResult};
use crate::time::Clock;

/// Public boxing key as published in a `-P` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxingKeyForPublication {
    pub metadata: KeyMetadata,
    pub public_key: BoxingPublicKey,
}

impl BoxingKeyForPublication {
    /// Read from a `-P` or `-U` block with `KeyUsage` = `Boxing`.
    pub fn from_block(block: &Block) -> KmuResult<Self> {
        let metadata =
            KeyMetadata::from_block(block, &[BlockType::P, BlockType::U], KeyUsage::Boxing)?;
        let public_key = BoxingPublicKey::from_bytes(b64url_decode_array(block.require("P")?)?);
        Ok(Self {
            metadata,
            public_key,
        })
    }

    pub fn to_block(&self) -> Block {
        self.metadata
            .to_block(BlockType::P, algorithm::BOXING)
            .with("P", b64url_encode(self.public_key.as_bytes()))
    }

    pub fn handle(&self) -> &str {
        self.metadata.handle.as_str()
    }
}

/// Open X25519 keypair as held in a `-U` block.
#[derive(Debug, Clone)]
pub struct BoxingKeyContents {
    pub public: BoxingKeyForPublication,
    secret: KeyBytes,
}

impl BoxingKeyContents {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, clock: &dyn Clock) -> Self {
        let metadata = KeyMetadata::generate(rng, clock, KeyUsage::Boxing);
        let secret = BoxingSecretKey::generate(rng);
        Self {
            public: BoxingKeyForPublication {
                metadata,
                public_key: secret.public_key(),
            },
            secret: KeyBytes::from_slice(secret.as_bytes()),
        }
    }

    pub fn from_block(block: &Block) -> KmuResult<Self> {
        let metadata = KeyMetadata::from_block(block, &[BlockType::U], KeyUsage::Boxing)?;
        let secret = BoxingSecretKey::from_bytes(b64url_decode_array(block.require("S")?)?);
        let derived = secret.public_key();

        if let Some(p) = block.get("P") {
            if BoxingPublicKey::from_bytes(b64url_decode_array(p)?) != derived {
                return Err(KmuError::invalid_block(
                    block.name(),
                    "P does not match the secret key",
                ));
            }
        }

        Ok(Self {
            public: BoxingKeyForPublication {
                metadata,
                public_key: derived,
            },
            secret: KeyBytes::from_slice(secret.as_bytes()),
        })
    }

    /// Full open block: publication entries plus `S`, named `<handle>-U`.
    pub fn to_block(&self) -> KmuResult<Block> {
        let secret = self.secret.bytes()?;
        Ok(self
            .public
            .to_block()
            .retyped(BlockType::U)
            .with("S", b64url_encode(secret)))
    }

    pub fn pub_block(&self) -> Block {
        self.public.to_block()
    }

    pub fn handle(&self) -> &str {
        self.public.handle()
    }

    pub fn secret_key(&self) -> KmuResult<BoxingSecretKey> {
        Ok(BoxingSecretKey::from_bytes(self.secret.to_array()?))
    }

    pub fn self_destruct(&mut self) {
        self.secret.self_destruct();
    }

    pub fn is_alive(&self) -> bool {
        self.secret.is_alive()
    }
}
