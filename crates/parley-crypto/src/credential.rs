//! Password hashing with Argon2id.
//!
//! The stored form is `base64url(argon2id(password, salt))`, where the salt is
//! the base64url text produced by [`generate_salt`]. The same inputs always
//! derive the same hash, so verification is re-derivation followed by a
//! constant-time comparison.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Length of the derived key in bytes.
pub const HASH_LEN: usize = 32;

/// Argon2 rejects salts shorter than this.
pub const MIN_SALT_LEN: usize = 8;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    /// 64 MiB, one pass, one lane.
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Derives and verifies password hashes with fixed Argon2id parameters.
#[derive(Clone)]
pub struct CredentialHasher {
    argon: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(params: HashParams) -> Result<Self, CryptoError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            Some(HASH_LEN),
        )
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Derive the storable hash of `password` under `salt`.
    pub fn derive_hash(&self, password: &str, salt: &str) -> Result<String, CryptoError> {
        let mut key = self.derive_key(password.as_bytes(), salt.as_bytes())?;
        let encoded = URL_SAFE.encode(key);
        key.zeroize();
        Ok(encoded)
    }

    /// Re-derive and compare against `stored_hash` without early exit.
    pub fn verify(
        &self,
        password: &str,
        salt: &str,
        stored_hash: &str,
    ) -> Result<bool, CryptoError> {
        let candidate = self.derive_hash(password, salt)?;
        Ok(candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into())
    }

    /// Raw 32-byte Argon2id output. The caller zeroizes it.
    pub(crate) fn derive_key(
        &self,
        password: &[u8],
        salt: &[u8],
    ) -> Result<[u8; HASH_LEN], CryptoError> {
        let mut out = [0u8; HASH_LEN];
        self.argon
            .hash_password_into(password, salt, &mut out)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        Ok(out)
    }
}

/// Produce `length` bytes from the OS entropy source, base64url-encoded.
pub fn generate_salt(length: usize) -> Result<String, CryptoError> {
    Ok(URL_SAFE.encode(random_bytes(length)?))
}

pub(crate) fn random_bytes(length: usize) -> Result<Vec<u8>, CryptoError> {
    if length < MIN_SALT_LEN {
        return Err(CryptoError::SaltTooShort {
            min: MIN_SALT_LEN,
            actual: length,
        });
    }
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::RandomnessUnavailable(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Cheap parameters so the suite stays fast in debug builds.
    fn test_hasher() -> CredentialHasher {
        CredentialHasher::new(HashParams {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn same_inputs_same_hash() {
        let hasher = test_hasher();
        let salt = generate_salt(32).unwrap();

        let h1 = hasher.derive_hash("correct horse", &salt).unwrap();
        let h2 = hasher.derive_hash("correct horse", &salt).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_salts_different_hashes() {
        let hasher = test_hasher();
        let h1 = hasher
            .derive_hash("correct horse", &generate_salt(32).unwrap())
            .unwrap();
        let h2 = hasher
            .derive_hash("correct horse", &generate_salt(32).unwrap())
            .unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn verify_accepts_only_the_right_password() {
        let hasher = test_hasher();
        let salt = generate_salt(32).unwrap();
        let stored = hasher.derive_hash("mysecret", &salt).unwrap();

        assert!(hasher.verify("mysecret", &salt, &stored).unwrap());
        assert!(!hasher.verify("wrongpassword", &salt, &stored).unwrap());
        assert!(!hasher.verify("mysecret", &salt, "truncated").unwrap());
    }

    #[test]
    fn salts_are_unique_and_sized() {
        let a = generate_salt(32).unwrap();
        let b = generate_salt(32).unwrap();
        assert_ne!(a, b);
        assert_eq!(URL_SAFE.decode(&a).unwrap().len(), 32);
    }

    #[test]
    fn short_salt_is_rejected() {
        let err = generate_salt(4).unwrap_err();
        assert!(matches!(err, CryptoError::SaltTooShort { actual: 4, .. }));
    }

    #[test]
    fn default_params_are_memory_hard() {
        let params = HashParams::default();
        assert_eq!(params.memory_kib, 65536);
        assert!(CredentialHasher::new(params).is_ok());
    }
}
