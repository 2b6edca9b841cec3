//! Compact handles: a random 128-bit UUID written in base 62.
//!
//! Digits are `0-9a-zA-Z`, most significant first, no padding. A UUID encodes
//! to at most 22 characters.

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, RngCore};
use uuid::{Builder, Uuid};

use crate::error::{KmuError, KmuResult};

const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const BASE: u128 = 62;

/// A base-62 handle naming a block or container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    /// Fresh random handle.
    pub fn generate() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Random v4 handle drawn from the supplied generator.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        Self::from_uuid(Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Encode a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(encode_u128(uuid.as_u128()))
    }

    /// Decode back to the UUID this handle was made from.
    ///
    /// Fails for caller-chosen handles that are not base 62 or overflow 128 bits.
    pub fn to_uuid(&self) -> KmuResult<Uuid> {
        decode_u128(&self.0).map(Uuid::from_u128)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Handle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Handle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for Handle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode_u128(mut value: u128) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }
    let mut digits = Vec::with_capacity(22);
    while value > 0 {
        digits.push(ALPHABET[(value % BASE) as usize]);
        value /= BASE;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

fn digit_value(c: char) -> Option<u128> {
    match c {
        '0'..='9' => Some(c as u128 - '0' as u128),
        'a'..='z' => Some(c as u128 - 'a' as u128 + 10),
        'A'..='Z' => Some(c as u128 - 'A' as u128 + 36),
        _ => None,
    }
}

fn decode_u128(text: &str) -> KmuResult<u128> {
    if text.is_empty() {
        return Err(KmuError::InvalidFormat("empty handle".to_string()));
    }
    text.chars().try_fold(0u128, |acc, c| {
        let digit = digit_value(c).ok_or_else(|| {
            KmuError::InvalidFormat(format!("'{}' is not a base-62 digit", c))
        })?;
        acc.checked_mul(BASE)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| KmuError::InvalidFormat(format!("handle {} exceeds 128 bits", text)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_small_values() {
        assert_eq!(encode_u128(0), "0");
        assert_eq!(encode_u128(61), "Z");
        assert_eq!(encode_u128(62), "10");
        assert_eq!(encode_u128(62 * 62 + 11), "10b");
    }

    #[test]
    fn test_uuid_roundtrip() {
        for _ in 0..32 {
            let uuid = Uuid::new_v4();
            let handle = Handle::from_uuid(uuid);
            assert!(handle.as_str().len() <= 22);
            assert_eq!(handle.to_uuid().unwrap(), uuid);
        }
    }

    #[test]
    fn test_max_uuid_fits() {
        let max = Uuid::from_u128(u128::MAX);
        let handle = Handle::from_uuid(max);
        assert_eq!(handle.as_str().len(), 22);
        assert_eq!(handle.to_uuid().unwrap(), max);
    }

    #[test]
    fn test_generated_handles_are_alphanumeric() {
        let handle = Handle::generate();
        assert!(handle.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_handle_from_seeded_rng() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let a = Handle::random(&mut StdRng::seed_from_u64(3));
        let b = Handle::random(&mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
        assert_eq!(a.to_uuid().unwrap().get_version_num(), 4);
    }

    #[test]
    fn test_decode_rejects_non_base62() {
        let handle = Handle::from("abc_def");
        assert!(matches!(handle.to_uuid(), Err(KmuError::InvalidFormat(_))));
    }

    #[test]
    fn test_decode_rejects_overflow() {
        let handle = Handle::from("ZZZZZZZZZZZZZZZZZZZZZZZ");
        assert!(handle.to_uuid().is_err());
    }
}
