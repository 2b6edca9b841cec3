//! URL-safe base64 used for every binary value stored in a block.
//!
//! Output is padded; input is accepted with or without padding.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as padded base64url.
pub fn b64url_encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_LENIENT.encode(data)
}

/// Decode base64url, with or without trailing padding.
pub fn b64url_decode(data: &str) -> CryptoResult<Vec<u8>> {
    URL_SAFE_LENIENT
        .decode(data.trim())
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid base64url: {}", e)))
}

/// Decode base64url into a fixed-size array.
pub fn b64url_decode_array<const N: usize>(data: &str) -> CryptoResult<[u8; N]> {
    let bytes = b64url_decode(data)?;
    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::InvalidFormat(format!("Expected {} bytes, got {}", N, bytes.len()))
    })
}
