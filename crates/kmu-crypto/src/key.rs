//! Holder for raw secret key bytes that can be destroyed explicitly.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Secret key bytes with an explicit destroy.
///
/// After [`KeyBytes::self_destruct`] the bytes are zeroed and every accessor
/// returns [`CryptoError::KeyUseAfterDestroy`]. Bytes are also wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyBytes {
    bytes: Vec<u8>,
    alive: bool,
}

impl KeyBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, alive: true }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    /// Borrow the key bytes.
    pub fn bytes(&self) -> CryptoResult<&[u8]> {
        if !self.alive {
            return Err(CryptoError::KeyUseAfterDestroy);
        }
        Ok(&self.bytes)
    }

    /// Copy into a fixed-size array.
    pub fn to_array<const N: usize>(&self) -> CryptoResult<[u8; N]> {
        let bytes = self.bytes()?;
        bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("Expected {} bytes, got {}", N, bytes.len()))
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Zero the bytes; later access fails.
    pub fn self_destruct(&mut self) {
        self.bytes.zeroize();
        self.alive = false;
    }
}

impl Clone for KeyBytes {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            alive: self.alive,
        }
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBytes")
            .field("len", &self.bytes.len())
            .field("alive", &self.alive)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
