//! Password-sealed text.
//!
//! Layout before base64: `[16-byte salt][12-byte nonce][ciphertext + tag]`.
//! The key is Argon2id(password, salt) with the hasher's cost parameters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use zeroize::Zeroize;

use crate::credential::{CredentialHasher, random_bytes};
use crate::error::CryptoError;

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;

/// Encrypt `plaintext` under a key derived from `password`.
pub fn seal_text(
    hasher: &CredentialHasher,
    plaintext: &str,
    password: &str,
) -> Result<String, CryptoError> {
    let salt = random_bytes(SALT_SIZE)?;
    let nonce = random_bytes(NONCE_SIZE)?;

    let cipher = cipher_for(hasher, password, &salt)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut sealed = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(sealed))
}

/// Reverse [`seal_text`]. Wrong password and tampering are indistinguishable.
pub fn open_text(
    hasher: &CredentialHasher,
    sealed: &str,
    password: &str,
) -> Result<String, CryptoError> {
    let data = STANDARD
        .decode(sealed)
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
    if data.len() < SALT_SIZE + NONCE_SIZE {
        return Err(CryptoError::InvalidEncoding(format!(
            "sealed payload is {} bytes, shorter than its header",
            data.len()
        )));
    }
    let (salt, rest) = data.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    let cipher = cipher_for(hasher, password, salt)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}

fn cipher_for(
    hasher: &CredentialHasher,
    password: &str,
    salt: &[u8],
) -> Result<ChaCha20Poly1305, CryptoError> {
    let mut key_bytes = hasher.derive_key(password.as_bytes(), salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key_bytes));
    key_bytes.zeroize();
    Ok(cipher)
}
