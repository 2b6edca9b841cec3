//! Key protection state machine: open `-U` blocks ⇄ protected `-X` blocks.
//!
//! Protecting replaces each `-U` block's `S` entry with an `X` entry holding
//! the PBE string and re-keys the block as `-X` at the same position. Opening
//! is the inverse. One password covers every block in the call; each block
//! gets its own salt and nonce.
//!
//! Both directions compute every new block before touching the container,
//! so a failure leaves the container unchanged. The password is taken by
//! value and wiped when the call returns, whichever way it returns.

use std::time::Instant;

use rand::{CryptoRng, RngCore};
use tracing::{info, trace, warn};
use zeroize::Zeroizing;

use kmu_crypto::pbe::{self, PbeParams, SingleUseGuard};
use kmu_crypto::{b64url_decode, b64url_encode, KdfParams, Password};

use crate::block::{Block, BlockType};
use crate::error::{KmuError, KmuResult};
use crate::kmu::Kmu;
use crate::logging::subsystem;

/// Entry holding the open secret key.
pub const SECRET_ENTRY: &str = "S";

/// Entry holding the PBE string.
pub const PROTECTED_ENTRY: &str = "X";

/// Protect every open key with default KDF cost and the OS generator.
pub fn protect(kmu: &mut Kmu, password: Password) -> KmuResult<usize> {
    protect_with(kmu, password, &KdfParams::default(), &mut rand::thread_rng())
}

/// Protect every open key with explicit KDF cost and generator.
///
/// Returns the number of blocks protected.
pub fn protect_with<R: RngCore + CryptoRng>(
    kmu: &mut Kmu,
    password: Password,
    kdf: &KdfParams,
    rng: &mut R,
) -> KmuResult<usize> {
    let start = Instant::now();
    let mut guard = SingleUseGuard::new();

    let mut staged = Vec::new();
    for block in kmu.find_all(BlockType::U) {
        trace!(block = block.name(), "Protecting key block");
        let params = PbeParams::generate(rng, *kdf);
        guard.consume(&params)?;
        staged.push((block.name().to_string(), protect_block(block, &password, &params)?));
    }

    let count = commit(kmu, staged)?;
    info!(
        subsystem = subsystem::PROTECT,
        op = "protect",
        block_count = count,
        duration_ms = start.elapsed().as_millis() as u64,
        "Key blocks protected"
    );
    Ok(count)
}

/// Open every protected key.
///
/// Returns the number of blocks opened. A wrong password fails with
/// [`KmuError::UnprotectFailed`] and leaves the container untouched.
pub fn open(kmu: &mut Kmu, password: Password) -> KmuResult<usize> {
    let start = Instant::now();

    let mut staged = Vec::new();
    for block in kmu.find_all(BlockType::X) {
        trace!(block = block.name(), "Opening key block");
        match open_block(block, &password) {
            Ok(opened) => staged.push((block.name().to_string(), opened)),
            Err(err) => {
                warn!(
                    subsystem = subsystem::PROTECT,
                    op = "open",
                    block = block.name(),
                    error = %err,
                    "Unable to open key block"
                );
                return Err(err);
            }
        }
    }

    let count = commit(kmu, staged)?;
    info!(
        subsystem = subsystem::PROTECT,
        op = "open",
        block_count = count,
        duration_ms = start.elapsed().as_millis() as u64,
        "Key blocks opened"
    );
    Ok(count)
}

/// Protect a single `-U` block, returning the `-X` replacement.
pub fn protect_block(block: &Block, password: &Password, params: &PbeParams) -> KmuResult<Block> {
    if !block.is_open() {
        return Err(KmuError::invalid_block(block.name(), "not an open key block"));
    }
    let secret = Zeroizing::new(b64url_decode(block.require(SECRET_ENTRY)?)?);
    let sealed = pbe::protect(params, password, &secret)?;

    let mut next = block.clone();
    next.remove(SECRET_ENTRY);
    next.put(PROTECTED_ENTRY, sealed);
    Ok(next.retyped(BlockType::X))
}

/// Open a single `-X` block, returning the `-U` replacement.
pub fn open_block(block: &Block, password: &Password) -> KmuResult<Block> {
    if !block.is_protected() {
        return Err(KmuError::invalid_block(block.name(), "not a protected key block"));
    }
    let secret = pbe::unprotect(password, block.require(PROTECTED_ENTRY)?)?;

    let mut next = block.clone();
    next.remove(PROTECTED_ENTRY);
    next.put(SECRET_ENTRY, b64url_encode(secret.as_slice()));
    Ok(next.retyped(BlockType::U))
}

/// Apply every replacement to a working copy and swap it in only when all of
/// them succeed.
fn commit(kmu: &mut Kmu, staged: Vec<(String, Block)>) -> KmuResult<usize> {
    let count = staged.len();
    if count == 0 {
        return Ok(0);
    }
    let mut next = kmu.clone();
    for (old_name, block) in staged {
        next.replace_block(&old_name, block)?;
    }
    *kmu = next;
    Ok(count)
}
