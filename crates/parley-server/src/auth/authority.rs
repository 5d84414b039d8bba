//! Token lifecycle: issuance, validation, persistence and rotation.
//!
//! Access tokens are stateless and live until their `exp`; nothing revokes
//! them early, not even account deletion. Refresh tokens are additionally
//! stored (as digests) and must match a live row to validate. Rotation
//! rewrites that row in place, so after `rotate(t) -> t2` only `t2` works.

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::claims::{TokenKind, VerifiedClaims};
use super::jwt::{IssuedToken, JwtManager};
use crate::error::{ChatError, ChatResult};
use crate::storage::{ChatDatabase, DatabaseError};

/// Access + refresh tokens handed to a client after login or rotation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(skip)]
    pub access_expires_at: i64,
    #[serde(skip)]
    pub refresh_expires_at: i64,
}

impl TokenPair {
    fn new(access: IssuedToken, refresh: IssuedToken) -> Self {
        Self {
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        }
    }
}

#[derive(Clone)]
pub struct TokenAuthority {
    jwt: JwtManager,
    db: ChatDatabase,
}

impl TokenAuthority {
    pub const fn new(jwt: JwtManager, db: ChatDatabase) -> Self {
        Self { jwt, db }
    }

    pub fn issue_access(&self, username: &str) -> ChatResult<IssuedToken> {
        self.jwt.issue_access_token(username)
    }

    pub fn issue_refresh(&self, username: &str) -> ChatResult<IssuedToken> {
        self.jwt.issue_refresh_token(username)
    }

    /// Store a refresh token against its owner.
    pub async fn persist_refresh(&self, username: &str, refresh: &IssuedToken) -> ChatResult<()> {
        let user = self
            .db
            .get_user_by_username(username)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => ChatError::UserNotFound(username.to_string()),
                other => other.into(),
            })?;

        let row_id = uuid::Uuid::new_v4().to_string();
        self.db
            .create_refresh_token(
                &row_id,
                &user.id,
                &JwtManager::hash_token(&refresh.token),
                refresh.expires_at,
            )
            .await
            .map_err(|e| ChatError::Persistence(e.to_string()))?;
        Ok(())
    }

    /// Issue both tokens and persist the refresh token.
    #[instrument(skip(self))]
    pub async fn issue_pair(&self, username: &str) -> ChatResult<TokenPair> {
        let access = self.issue_access(username)?;
        let refresh = self.issue_refresh(username)?;
        self.persist_refresh(username, &refresh).await?;
        Ok(TokenPair::new(access, refresh))
    }

    pub fn validate_access(&self, token: &str) -> ChatResult<VerifiedClaims> {
        self.jwt.validate(token, TokenKind::Access)
    }

    /// Signature and kind checks plus a lookup of a live stored row.
    pub async fn validate_refresh(&self, token: &str) -> ChatResult<VerifiedClaims> {
        let claims = self.jwt.validate(token, TokenKind::Refresh)?;

        let stored = self
            .db
            .get_refresh_token_by_hash(&JwtManager::hash_token(token))
            .await?;
        if stored.is_none() {
            warn!(username = %claims.username(), "Refresh token not on record");
            return Err(ChatError::InvalidCredential);
        }

        Ok(claims)
    }

    /// Exchange a live refresh token for a new pair, rewriting its row.
    #[instrument(skip_all)]
    pub async fn rotate(&self, refresh_token: &str) -> ChatResult<TokenPair> {
        let claims = self.validate_refresh(refresh_token).await?;
        let username = claims.username();

        let access = self.issue_access(username)?;
        let refresh = self.issue_refresh(username)?;

        let rotated = self
            .db
            .rotate_refresh_token(
                &JwtManager::hash_token(refresh_token),
                &JwtManager::hash_token(&refresh.token),
                refresh.expires_at,
            )
            .await?;
        if !rotated {
            // Lost a race with a concurrent rotation of the same token.
            warn!(username = %username, "Refresh token superseded during rotation");
            return Err(ChatError::InvalidCredential);
        }

        info!(username = %username, "Refresh token rotated");
        Ok(TokenPair::new(access, refresh))
    }

    /// Forget a refresh token. Unknown values are not an error.
    pub async fn revoke(&self, refresh_token: &str) -> ChatResult<bool> {
        self.jwt.validate(refresh_token, TokenKind::Refresh)?;
        Ok(self
            .db
            .delete_refresh_token(&JwtManager::hash_token(refresh_token))
            .await?)
    }

    pub async fn purge_expired(&self) -> ChatResult<u64> {
        Ok(self.db.delete_expired_refresh_tokens().await?)
    }
}
