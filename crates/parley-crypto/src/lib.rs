//! `Parley` credential and sealing primitives.
//!
//! ## Crypto primitives
//!
//! - **Credentials**: Argon2id over (password, per-account random salt), compared
//!   in constant time
//! - **Sealed text**: Argon2id-derived key → ChaCha20-Poly1305 AEAD, random
//!   16-byte salt and 12-byte nonce carried alongside the ciphertext

pub mod credential;
pub mod error;
pub mod sealed;

pub use credential::{CredentialHasher, HashParams, generate_salt};
pub use error::CryptoError;
pub use sealed::{open_text, seal_text};
