//! JWT token issuance and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};

use parley_core::db::unix_timestamp;

use super::claims::{Claims, TokenKind, VerifiedClaims};
use crate::error::{ChatError, ChatResult};

/// A signed token and the unix time it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Signs and verifies HS256 tokens with one process-wide secret.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtManager {
    /// An empty secret is a fatal configuration error.
    pub fn new(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> ChatResult<Self> {
        if secret.is_empty() {
            return Err(ChatError::Configuration(
                "token signing key is missing".into(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }

    pub const fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub const fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Issue an access token for the given user.
    pub fn issue_access_token(&self, username: &str) -> ChatResult<IssuedToken> {
        self.issue(username, TokenKind::Access, self.access_ttl_secs)
    }

    /// Issue a refresh token for the given user.
    pub fn issue_refresh_token(&self, username: &str) -> ChatResult<IssuedToken> {
        self.issue(username, TokenKind::Refresh, self.refresh_ttl_secs)
    }

    fn issue(&self, username: &str, kind: TokenKind, ttl_secs: i64) -> ChatResult<IssuedToken> {
        let now = unix_timestamp();
        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: username.to_string(),
            iat: now,
            exp: now + ttl_secs,
            token_type: kind,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ChatError::Configuration(format!("token signing failed: {e}")))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify signature, expiry and kind. Every failure collapses into
    /// `InvalidCredential`.
    pub fn validate(&self, token: &str, expected: TokenKind) -> ChatResult<VerifiedClaims> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                ChatError::InvalidCredential
            })?;

        if data.claims.token_type != expected {
            tracing::debug!(
                expected = ?expected,
                actual = ?data.claims.token_type,
                "Token kind mismatch"
            );
            return Err(ChatError::InvalidCredential);
        }

        Ok(VerifiedClaims::new(data.claims))
    }

    /// Hash a token for storage (raw refresh tokens are never stored).
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_jwt() -> JwtManager {
        JwtManager::new(b"test-secret-key-for-testing", 3600, 86400).unwrap()
    }

    #[test]
    fn issue_and_validate_access_token() {
        let jwt = test_jwt();
        let issued = jwt.issue_access_token("alice").unwrap();
        assert!(issued.expires_at > unix_timestamp());

        let claims = jwt.validate(&issued.token, TokenKind::Access).unwrap();
        assert_eq!(claims.username(), "alice");
        assert_eq!(claims.kind(), TokenKind::Access);
        assert_eq!(claims.expires_at(), issued.expires_at);
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let jwt = test_jwt();
        let access = jwt.issue_access_token("alice").unwrap();
        let refresh = jwt.issue_refresh_token("alice").unwrap();

        assert!(matches!(
            jwt.validate(&access.token, TokenKind::Refresh),
            Err(ChatError::InvalidCredential)
        ));
        assert!(matches!(
            jwt.validate(&refresh.token, TokenKind::Access),
            Err(ChatError::InvalidCredential)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = JwtManager::new(b"test-secret", -1, 86400).unwrap();
        let issued = jwt.issue_access_token("alice").unwrap();
        assert!(matches!(
            jwt.validate(&issued.token, TokenKind::Access),
            Err(ChatError::InvalidCredential)
        ));
    }

    #[test]
    fn garbage_and_foreign_tokens_fail_alike() {
        let jwt = test_jwt();
        let other = JwtManager::new(b"different-secret", 3600, 86400).unwrap();
        let foreign = other.issue_access_token("alice").unwrap();

        assert!(matches!(
            jwt.validate("not-a-valid-token", TokenKind::Access),
            Err(ChatError::InvalidCredential)
        ));
        assert!(matches!(
            jwt.validate(&foreign.token, TokenKind::Access),
            Err(ChatError::InvalidCredential)
        ));
    }

    #[test]
    fn tokens_issued_together_differ() {
        let jwt = test_jwt();
        let a = jwt.issue_refresh_token("alice").unwrap();
        let b = jwt.issue_refresh_token("alice").unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        assert!(matches!(
            JwtManager::new(b"", 3600, 86400),
            Err(ChatError::Configuration(_))
        ));
    }

    #[test]
    fn token_hash_is_deterministic() {
        let h1 = JwtManager::hash_token("same-token");
        let h2 = JwtManager::hash_token("same-token");
        assert_eq!(h1, h2);
        assert_ne!(h1, JwtManager::hash_token("different-token"));
    }
}
