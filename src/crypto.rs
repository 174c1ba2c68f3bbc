use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Key, Nonce};
use rand::RngCore;
use rand_chacha::ChaCha12Rng;
use sha2::{Digest, Sha256};

use crate::error::{GabesError, Result};

/// Symmetric key length in bytes (AES-128).
pub const KEY_LEN: usize = 16;
/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Domain separator for the deterministic zero-ciphertext nonce.
const ZERO_NONCE_DOMAIN: &[u8] = b"gabes.grr3.zero";

/// Derive the composite key for a pair of labels: `SHA-256(a || b)[..16]`.
///
/// Used by the reduced-row scheme so a table row is a single AEAD layer
/// instead of two nested ones.
pub fn derive_key(key_a: &[u8; KEY_LEN], key_b: &[u8; KEY_LEN]) -> [u8; KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(key_a);
    hasher.update(key_b);
    let hash = hasher.finalize();

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&hash[..KEY_LEN]);
    key
}

/// Encrypt `plaintext` under `key` with a random 96-bit nonce.
///
/// The returned ciphertext is nonce || body || tag.
pub fn encrypt(rng: &mut ChaCha12Rng, key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);
    encrypt_with_nonce(key, &nonce_bytes, plaintext)
}

/// Decrypt a nonce || body || tag ciphertext produced by [`encrypt`].
///
/// Fails with a decryption error on tag mismatch. Under the classical
/// scheme this failure is the row-selection oracle and is swallowed by
/// the caller; everywhere else it is fatal.
pub fn decrypt(key: &[u8; KEY_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < NONCE_LEN + TAG_LEN {
        return Err(GabesError::Decryption(format!(
            "ciphertext too short: {} bytes",
            ciphertext.len()
        )));
    }

    let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(&ciphertext[..NONCE_LEN]);
    cipher
        .decrypt(nonce, &ciphertext[NONCE_LEN..])
        .map_err(|_| GabesError::Decryption("authentication tag mismatch".to_string()))
}

/// Deterministic encryption of `length` zero bytes under the composite
/// key of `(key_a, key_b)`.
///
/// Both parties must compute the identical ciphertext, so the nonce is
/// derived from the two keys rather than drawn at random. The reduced-row
/// scheme takes the body of this ciphertext as the output label of the
/// untransmitted table row.
pub fn zero_ciphertext(key_a: &[u8; KEY_LEN], key_b: &[u8; KEY_LEN], length: usize) -> Vec<u8> {
    let key = derive_key(key_a, key_b);

    let mut hasher = Sha256::new();
    hasher.update(ZERO_NONCE_DOMAIN);
    hasher.update(key_a);
    hasher.update(key_b);
    let hash = hasher.finalize();

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&hash[..NONCE_LEN]);

    // Encryption of a fixed plaintext under a fixed key and nonce cannot
    // fail for any length this crate uses.
    encrypt_with_nonce(&key, &nonce, &vec![0u8; length])
        .expect("zero ciphertext encryption cannot fail")
}

/// Extract the body (keystream over zeros) of a [`zero_ciphertext`].
pub fn zero_ciphertext_body(ciphertext: &[u8], length: usize) -> &[u8] {
    &ciphertext[NONCE_LEN..NONCE_LEN + length]
}

fn encrypt_with_nonce(
    key: &[u8; KEY_LEN],
    nonce_bytes: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);
    let body = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| GabesError::Decryption("encryption failure".to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + body.len());
    out.extend_from_slice(nonce_bytes);
    out.extend_from_slice(&body);
    Ok(out)
}
