//! Data models for Parley storage.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub role: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A persisted refresh token. Only the SHA-256 digest of the value is kept.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshTokenRow {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub created_at: i64,
}

/// A chat message. `created_at` is unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub content: String,
    pub created_at: i64,
}

impl Message {
    /// Creation time as an RFC 3339 string (UTC, second precision).
    pub fn created_rfc3339(&self) -> String {
        millis_to_rfc3339(self.created_at)
    }
}

/// Latest message exchanged with one conversation partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationPeer {
    pub peer: String,
    pub last_message: String,
    pub created_at: i64,
}

pub fn millis_to_rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}
