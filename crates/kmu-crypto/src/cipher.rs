//! AES-256-GCM cipher operations.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{CryptoRng, RngCore};

use crate::error::{CryptoError, CryptoResult};

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Fill a fixed-size array from the supplied generator.
pub fn generate_random<const N: usize, R: RngCore + CryptoRng>(rng: &mut R) -> [u8; N] {
    let mut bytes = [0u8; N];
    rng.fill_bytes(&mut bytes);
    bytes
}

/// Generate a random salt (32 bytes).
pub fn generate_salt<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; 32] {
    generate_random(rng)
}

/// Generate a random nonce (12 bytes).
pub fn generate_nonce<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; NONCE_LEN] {
    generate_random(rng)
}

/// Encrypt plaintext with AES-256-GCM.
///
/// Returns ciphertext with appended authentication tag (16 bytes).
pub fn aes_gcm_encrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))
}

/// Decrypt ciphertext with AES-256-GCM.
///
/// The ciphertext must include the authentication tag (16 bytes) at the end.
pub fn aes_gcm_decrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| CryptoError::Decryption("Invalid key".to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption("AES-GCM decryption failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_salt_from_injected_rng() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);

        assert_eq!(generate_salt(&mut a), generate_salt(&mut b));
        assert_ne!(generate_salt(&mut a), [0u8; 32]);
    }

    #[test]
    fn test_generate_nonce_advances() {
        let mut rng = rand::thread_rng();
        let n1 = generate_nonce(&mut rng);
        let n2 = generate_nonce(&mut rng);
        assert_ne!(n1, n2);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [42u8; 32];
        let nonce = [1u8; NONCE_LEN];
        let plaintext = b"Hello, World!";

        let ciphertext = aes_gcm_encrypt(&key, &nonce, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_LEN);

        let decrypted = aes_gcm_decrypt(&key, &nonce, &ciphertext).unwrap();
        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let nonce = [1u8; NONCE_LEN];
        let ciphertext = aes_gcm_encrypt(&[42u8; 32], &nonce, b"Secret data").unwrap();

        let result = aes_gcm_decrypt(&[99u8; 32], &nonce, &ciphertext);
        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext() {
        let key = [42u8; 32];
        let nonce = [1u8; NONCE_LEN];
        let mut ciphertext = aes_gcm_encrypt(&key, &nonce, b"Secret data").unwrap();
        ciphertext[0] ^= 0xff;

        assert!(aes_gcm_decrypt(&key, &nonce, &ciphertext).is_err());
    }
}
