//! Crypto error types.

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The OS entropy source failed; no partial output is ever returned.
    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error("Salt too short: need at least {min} bytes, got {actual}")]
    SaltTooShort { min: usize, actual: usize },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}
