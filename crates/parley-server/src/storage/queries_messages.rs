//! Chat message queries.

use parley_core::db::{DatabaseError, unix_millis};

use super::db::ChatDatabase;
use super::models::{ConversationPeer, Message};

impl ChatDatabase {
    /// Insert a message stamped with the current time.
    pub async fn insert_message(
        &self,
        sender: &str,
        recipient: &str,
        content: &str,
    ) -> Result<Message, DatabaseError> {
        let created_at = unix_millis();

        let result = sqlx::query(
            "INSERT INTO messages (sender, recipient, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(sender)
        .bind(recipient)
        .bind(content)
        .bind(created_at)
        .execute(self.pool())
        .await?;

        Ok(Message {
            id: result.last_insert_rowid(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            content: content.to_string(),
            created_at,
        })
    }

    /// Get a message by ID.
    pub async fn get_message(&self, id: i64) -> Result<Message, DatabaseError> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Message {id}")))
    }

    /// Sender of a message, if the message exists.
    pub async fn message_sender(&self, id: i64) -> Result<Option<String>, DatabaseError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT sender FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|(sender,)| sender))
    }

    /// Replace a message's content, only if `sender` still owns it.
    pub async fn update_message_content(
        &self,
        id: i64,
        sender: &str,
        content: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE messages SET content = ? WHERE id = ? AND sender = ?")
            .bind(content)
            .bind(id)
            .bind(sender)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a message, only if `sender` owns it.
    pub async fn delete_message(&self, id: i64, sender: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ? AND sender = ?")
            .bind(id)
            .bind(sender)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every message between `a` and `b`, oldest first.
    pub async fn list_thread(&self, a: &str, b: &str) -> Result<Vec<Message>, DatabaseError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages \
             WHERE (sender = ? AND recipient = ?) OR (sender = ? AND recipient = ?) \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(self.pool())
        .await?;

        Ok(messages)
    }

    /// One row per conversation partner of `user`, most recent first.
    pub async fn list_peers(&self, user: &str) -> Result<Vec<ConversationPeer>, DatabaseError> {
        let peers = sqlx::query_as::<_, ConversationPeer>(
            "SELECT peer, content AS last_message, created_at FROM ( \
                 SELECT CASE WHEN sender = ? THEN recipient ELSE sender END AS peer, \
                        content, created_at, id, \
                        ROW_NUMBER() OVER ( \
                            PARTITION BY CASE WHEN sender = ? THEN recipient ELSE sender END \
                            ORDER BY created_at DESC, id DESC \
                        ) AS rn \
                 FROM messages \
                 WHERE sender = ? OR recipient = ? \
             ) \
             WHERE rn = 1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user)
        .bind(user)
        .bind(user)
        .bind(user)
        .fetch_all(self.pool())
        .await?;

        Ok(peers)
    }
}
