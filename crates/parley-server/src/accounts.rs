//! Account registration, login and removal.

use parley_crypto::{CredentialHasher, CryptoError, generate_salt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::auth::{TokenAuthority, TokenPair};
use crate::error::{ChatError, ChatResult};
use crate::storage::{ChatDatabase, DatabaseError, User};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub email: String,
}

#[derive(Clone)]
pub struct AccountService {
    db: ChatDatabase,
    hasher: CredentialHasher,
    tokens: TokenAuthority,
    salt_len: usize,
}

impl AccountService {
    pub const fn new(
        db: ChatDatabase,
        hasher: CredentialHasher,
        tokens: TokenAuthority,
        salt_len: usize,
    ) -> Self {
        Self {
            db,
            hasher,
            tokens,
            salt_len,
        }
    }

    #[instrument(skip(self, email, password))]
    pub async fn register(&self, username: &str, email: &str, password: &str) -> ChatResult<User> {
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(ChatError::Validation(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ChatError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if email.trim().is_empty() {
            return Err(ChatError::Validation("Email is required".into()));
        }

        if self.db.get_user_by_username(username).await.is_ok() {
            return Err(ChatError::Conflict("Username already taken".into()));
        }

        let salt = generate_salt(self.salt_len)?;
        let hash = self.derive_hash(password, &salt).await?;

        let user_id = uuid::Uuid::new_v4().to_string();
        let user = self
            .db
            .create_user(&user_id, username, email, &hash, &salt)
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> ChatResult<TokenPair> {
        let user = self.authenticate(username, password).await?;
        let pair = self.tokens.issue_pair(&user.username).await?;
        info!(username = %user.username, "User logged in");
        Ok(pair)
    }

    /// Remove an account after re-checking its password. Access tokens
    /// already handed out keep working until they expire.
    #[instrument(skip(self, password))]
    pub async fn delete_account(&self, username: &str, password: &str) -> ChatResult<()> {
        let user = self.authenticate(username, password).await?;
        if !self.db.delete_user(&user.username).await? {
            return Err(ChatError::UserNotFound(user.username));
        }
        info!(username = %user.username, "Account deleted");
        Ok(())
    }

    pub async fn list_users(&self) -> ChatResult<Vec<UserSummary>> {
        let users = self.db.list_users().await?;
        Ok(users
            .into_iter()
            .map(|u| UserSummary {
                username: u.username,
                email: u.email,
            })
            .collect())
    }

    /// Unknown user and wrong password are indistinguishable to the caller.
    async fn authenticate(&self, username: &str, password: &str) -> ChatResult<User> {
        let user = match self.db.get_user_by_username(username).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound(_)) => {
                warn!(username = %username, "Login for unknown user");
                return Err(ChatError::InvalidCredential);
            }
            Err(e) => return Err(e.into()),
        };

        let hasher = self.hasher.clone();
        let candidate = password.to_string();
        let salt = user.salt.clone();
        let stored = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&candidate, &salt, &stored))
            .await
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))??;

        if !valid {
            warn!(username = %username, "Failed login attempt");
            return Err(ChatError::InvalidCredential);
        }
        Ok(user)
    }

    /// Argon2 is CPU-bound; keep it off the async workers.
    async fn derive_hash(&self, password: &str, salt: &str) -> ChatResult<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let salt = salt.to_string();
        let hash = tokio::task::spawn_blocking(move || hasher.derive_hash(&password, &salt))
            .await
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))??;
        Ok(hash)
    }
}
