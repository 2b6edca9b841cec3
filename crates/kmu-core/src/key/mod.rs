//! Typed views over key blocks.
//!
//! Key blocks share a common header (`KeyAlgorithm`, `KeyUsage`, `CreatedOn`)
//! followed by `P` (public key) and, for open keys, `S` (secret key), both
//! base64url. Views are built on demand from a [`Block`] and turned back into
//! blocks; the block stays the source of truth inside a container.

mod boxing;
mod secret_box;
mod signing;

pub use boxing::{BoxingKeyContents, BoxingKeyForPublication};
pub use secret_box::SecretBoxKeyContents;
pub use signing::{SigningKeyContents, SigningKeyForPublication};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use rand::{CryptoRng, RngCore};

use crate::block::{Block, BlockType};
use crate::error::{KmuError, KmuResult};
use crate::handle::Handle;
use crate::time::{format_timestamp, parse_timestamp, Clock};

/// What a key is for, stored in the `KeyUsage` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUsage {
    Signing,
    Boxing,
    SecretBox,
    Agreement,
}

impl KeyUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signing => "Signing",
            Self::Boxing => "Boxing",
            Self::SecretBox => "SecretBox",
            Self::Agreement => "Agreement",
        }
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyUsage {
    type Err = KmuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Signing" => Ok(Self::Signing),
            "Boxing" => Ok(Self::Boxing),
            "SecretBox" => Ok(Self::SecretBox),
            "Agreement" => Ok(Self::Agreement),
            other => Err(KmuError::InvalidFormat(format!("Unknown KeyUsage: {}", other))),
        }
    }
}

/// Header shared by every key block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    pub handle: Handle,
    pub created_on: DateTime<Utc>,
    pub usage: KeyUsage,
}

impl KeyMetadata {
    /// Fresh handle from `rng`, creation time from `clock` at millisecond precision.
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        clock: &dyn Clock,
        usage: KeyUsage,
    ) -> Self {
        Self {
            handle: Handle::random(rng),
            created_on: clock.now().trunc_subsecs(3),
            usage,
        }
    }

    /// Header entries in their fixed order.
    pub(crate) fn to_block(&self, kind: BlockType, algorithm: &str) -> Block {
        Block::with_handle(self.handle.clone(), kind)
            .with("KeyAlgorithm", algorithm)
            .with("KeyUsage", self.usage.as_str())
            .with("CreatedOn", format_timestamp(&self.created_on))
    }

    /// Read the header, checking the block type and usage.
    pub(crate) fn from_block(
        block: &Block,
        allowed: &[BlockType],
        usage: KeyUsage,
    ) -> KmuResult<Self> {
        if !allowed.contains(&block.block_type()) {
            return Err(KmuError::invalid_block(
                block.name(),
                format!("expected a {:?} block", allowed),
            ));
        }
        let found = block.require("KeyUsage")?;
        if found != usage.as_str() {
            return Err(KmuError::invalid_block(
                block.name(),
                format!("KeyUsage is {}, expected {}", found, usage),
            ));
        }
        Ok(Self {
            handle: Handle::from(block.base_handle()),
            created_on: parse_timestamp(block.require("CreatedOn")?)?,
            usage,
        })
    }
}

/// Key algorithm labels written into `KeyAlgorithm`.
pub mod algorithm {
    pub const SIGNING: &str = "Ed25519";
    pub const BOXING: &str = "X25519";
    pub const SECRET_BOX: &str = "AES-256-GCM";
}
