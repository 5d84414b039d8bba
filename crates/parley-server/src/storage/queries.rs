//! User and refresh-token queries.

use parley_core::db::{DatabaseError, unix_timestamp};

use super::db::ChatDatabase;
use super::models::{RefreshTokenRow, User};

impl ChatDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new user. Duplicate usernames or emails fail with
    /// `DatabaseError::Constraint`.
    pub async fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, salt, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 'user', ?, ?)",
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(salt)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with username {username}")))
    }

    /// All users, oldest account first.
    pub async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, username")
            .fetch_all(self.pool())
            .await?;
        Ok(users)
    }

    /// Delete a user. Their refresh tokens go with them (`ON DELETE CASCADE`).
    pub async fn delete_user(&self, username: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Refresh token queries
    // =========================================================================

    /// Store a refresh token digest.
    pub async fn create_refresh_token(
        &self,
        id: &str,
        user_id: &str,
        token_hash: &str,
        expires_at: i64,
    ) -> Result<RefreshTokenRow, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(now)
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, RefreshTokenRow>("SELECT * FROM refresh_tokens WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Refresh token {id}")))
    }

    /// Find a non-expired refresh token by digest.
    pub async fn get_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRow>, DatabaseError> {
        let now = unix_timestamp();

        let token = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT * FROM refresh_tokens WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(token)
    }

    /// Swap a live refresh token's digest and expiry in place.
    ///
    /// Returns `false` when no live row holds `old_hash`, including when a
    /// concurrent rotation of the same token already won.
    pub async fn rotate_refresh_token(
        &self,
        old_hash: &str,
        new_hash: &str,
        new_expires_at: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET token_hash = ?, expires_at = ? WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(new_hash)
        .bind(new_expires_at)
        .bind(old_hash)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a refresh token by digest.
    pub async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every expired refresh token row.
    pub async fn delete_expired_refresh_tokens(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(unix_timestamp())
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Count stored refresh rows for a user, live or not.
    pub async fn count_refresh_tokens(&self, user_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        Ok(row.0)
    }
}
