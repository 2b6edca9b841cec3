//! Integration tests for the primitive layer as the container code uses it.
//!
//! This test suite validates:
//! - Signing a digest and recovering it from the attached signature
//! - Password protection of signing and boxing key bytes
//! - Boxing between two generated keypairs
//! - Single-use enforcement across a batch of protect calls

use kmu_crypto::boxing::{open, seal, BoxingSecretKey};
use kmu_crypto::pbe::{protect, unprotect};
use kmu_crypto::sign::{open_attached, sign_attached, SigningSecretKey};
use kmu_crypto::{
    b64url_decode, b64url_encode, CryptoError, DigestAlgorithm, KdfParams, Password, PbeParams,
    SingleUseGuard,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn cheap_kdf() -> KdfParams {
    KdfParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

// ============================================================================
// Test Category 1: Digest + Signature
// ============================================================================

#[test]
fn test_every_digest_signs_and_opens() {
    let key = SigningSecretKey::generate(&mut StdRng::seed_from_u64(100));

    for alg in DigestAlgorithm::ALL {
        let mut hasher = alg.hasher();
        hasher.update(b"2026-10-16T08:15:30.123Z");
        hasher.update(b"Chinese_Knees");
        let hash = hasher.finalize();

        let signed = sign_attached(&key, &hash).unwrap();
        let encoded = b64url_encode(&signed);

        let decoded = b64url_decode(&encoded).unwrap();
        let recovered = open_attached(&key.public_key(), &decoded).unwrap();
        assert_eq!(recovered, hash, "digest {} did not survive", alg);
    }
}

#[test]
fn test_recovered_hash_differs_for_different_digest() {
    let key = SigningSecretKey::generate(&mut StdRng::seed_from_u64(101));
    let signed = sign_attached(&key, &DigestAlgorithm::CubeHash256.digest(b"x")).unwrap();

    let recovered = open_attached(&key.public_key(), &signed).unwrap();
    assert_ne!(recovered, DigestAlgorithm::Sha3_256.digest(b"x"));
}

// ============================================================================
// Test Category 2: Password Protection of Key Bytes
// ============================================================================

#[test]
fn test_protect_signing_keypair_bytes() {
    let mut rng = StdRng::seed_from_u64(200);
    let key = SigningSecretKey::generate(&mut rng);
    let password = Password::from("keystore password 2026");

    let params = PbeParams::generate(&mut rng, cheap_kdf());
    let sealed = protect(&params, &password, key.as_bytes()).unwrap();
    let opened = unprotect(&password, &sealed).unwrap();

    let restored = SigningSecretKey::from_keypair_bytes(&opened).unwrap();
    assert_eq!(restored.public_key(), key.public_key());
}

#[test]
fn test_batch_with_guard_never_repeats() {
    let mut rng = StdRng::seed_from_u64(201);
    let mut guard = SingleUseGuard::new();

    for _ in 0..16 {
        let params = PbeParams::generate(&mut rng, cheap_kdf());
        guard.consume(&params).unwrap();
    }
    assert_eq!(guard.len(), 16);
}

#[test]
fn test_repeated_generator_state_detected() {
    let mut guard = SingleUseGuard::new();
    let a = PbeParams::generate(&mut StdRng::seed_from_u64(5), cheap_kdf());
    let b = PbeParams::generate(&mut StdRng::seed_from_u64(5), cheap_kdf());

    guard.consume(&a).unwrap();
    assert!(matches!(
        guard.consume(&b),
        Err(CryptoError::ReusedCryptographicMaterial(_))
    ));
}

// ============================================================================
// Test Category 3: Boxing
// ============================================================================

#[test]
fn test_box_between_generated_keys() {
    let mut rng = StdRng::seed_from_u64(300);
    let sender = BoxingSecretKey::generate(&mut rng);
    let receiver = BoxingSecretKey::generate(&mut rng);
    let nonce = kmu_crypto::cipher::generate_nonce(&mut rng);

    let ct = seal(&sender, &receiver.public_key(), &nonce, b"envelope body").unwrap();
    let pt = open(&receiver, &sender.public_key(), &nonce, &ct).unwrap();
    assert_eq!(pt, b"envelope body");

    let wrong_nonce = [0xffu8; 12];
    assert!(open(&receiver, &sender.public_key(), &wrong_nonce, &ct).is_err());
}
