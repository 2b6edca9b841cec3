//! Encrypted payload envelopes (`-E` blocks).
//!
//! An envelope is sealed from a sender's boxing key to a receiver's published
//! boxing key. It records both handles so the receiver can pick the right
//! keys before attempting to open it.

use rand::{CryptoRng, RngCore};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use kmu_crypto::boxing;
use kmu_crypto::cipher::generate_nonce;
use kmu_crypto::{b64url_decode, b64url_decode_array, b64url_encode};

use crate::block::{Block, BlockType};
use crate::error::{KmuError, KmuResult};
use crate::key::{BoxingKeyContents, BoxingKeyForPublication};
use crate::logging::subsystem;

/// Entry names of an envelope block.
pub mod entry {
    /// Sender key handle.
    pub const SENDER: &str = "S";
    /// Receiver key handle.
    pub const RECEIVER: &str = "P";
    pub const NONCE: &str = "Nonce.0";
    pub const DATA: &str = "Data.0";
}

/// Seal `plaintext` into a fresh `-E` block.
pub fn encrypt<R: RngCore + CryptoRng>(
    sender: &BoxingKeyContents,
    receiver: &BoxingKeyForPublication,
    plaintext: &[u8],
    rng: &mut R,
) -> KmuResult<Block> {
    let nonce = generate_nonce(rng);
    let sealed = boxing::seal(&sender.secret_key()?, &receiver.public_key, &nonce, plaintext)?;

    let block = Block::new_with_rng(BlockType::E, rng)
        .with(entry::SENDER, sender.handle())
        .with(entry::RECEIVER, receiver.handle())
        .with(entry::NONCE, b64url_encode(nonce))
        .with(entry::DATA, b64url_encode(sealed));
    debug!(
        subsystem = subsystem::ENVELOPE,
        op = "encrypt",
        block = block.name(),
        bytes = plaintext.len(),
        "Envelope sealed"
    );
    Ok(block)
}

/// Open an `-E` block addressed to `receiver` from `sender`.
///
/// The handles recorded in the block must match the supplied keys.
pub fn decrypt(
    block: &Block,
    receiver: &BoxingKeyContents,
    sender: &BoxingKeyForPublication,
) -> KmuResult<Zeroizing<Vec<u8>>> {
    if block.block_type() != BlockType::E {
        return Err(KmuError::invalid_block(block.name(), "not an envelope block"));
    }
    check_handle(block, entry::SENDER, sender.handle())?;
    check_handle(block, entry::RECEIVER, receiver.handle())?;

    let nonce = b64url_decode_array(block.require(entry::NONCE)?)?;
    let sealed = b64url_decode(block.require(entry::DATA)?)?;
    let plaintext = boxing::open(&receiver.secret_key()?, &sender.public_key, &nonce, &sealed)?;
    Ok(Zeroizing::new(plaintext))
}

fn check_handle(block: &Block, key: &str, expected: &str) -> KmuResult<()> {
    let found = block.require(key)?;
    if found != expected {
        warn!(
            subsystem = subsystem::ENVELOPE,
            block = block.name(),
            entry = key,
            "Envelope addressed to a different key"
        );
        return Err(KmuError::invalid_block(
            block.name(),
            format!("{} is {}, expected {}", key, found, expected),
        ));
    }
    Ok(())
}
