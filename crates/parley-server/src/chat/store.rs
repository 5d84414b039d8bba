//! Message persistence with sender-only mutation.

use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};
use crate::storage::{ChatDatabase, ConversationPeer, Message};

#[derive(Clone)]
pub struct MessageStore {
    db: ChatDatabase,
}

impl MessageStore {
    pub const fn new(db: ChatDatabase) -> Self {
        Self { db }
    }

    pub async fn create(&self, sender: &str, recipient: &str, content: &str) -> ChatResult<Message> {
        let message = self.db.insert_message(sender, recipient, content).await?;
        debug!(message_id = message.id, from = %sender, to = %recipient, "Message stored");
        Ok(message)
    }

    pub async fn edit(&self, id: i64, requester: &str, new_content: &str) -> ChatResult<()> {
        self.authorize(id, requester).await?;
        if !self
            .db
            .update_message_content(id, requester, new_content)
            .await?
        {
            // Deleted between the ownership check and the update.
            return Err(ChatError::NotFound(format!("Message {id}")));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64, requester: &str) -> ChatResult<()> {
        self.authorize(id, requester).await?;
        if !self.db.delete_message(id, requester).await? {
            return Err(ChatError::NotFound(format!("Message {id}")));
        }
        Ok(())
    }

    /// Both directions of the conversation between `a` and `b`, oldest first.
    pub async fn list_thread(&self, a: &str, b: &str) -> ChatResult<Vec<Message>> {
        Ok(self.db.list_thread(a, b).await?)
    }

    /// One entry per conversation partner, most recent first.
    pub async fn list_peers(&self, user: &str) -> ChatResult<Vec<ConversationPeer>> {
        Ok(self.db.list_peers(user).await?)
    }

    async fn authorize(&self, id: i64, requester: &str) -> ChatResult<()> {
        let sender = self
            .db
            .message_sender(id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("Message {id}")))?;

        if sender != requester {
            warn!(message_id = id, requester = %requester, "Mutation by non-sender rejected");
            return Err(ChatError::Unauthorized(format!(
                "Message {id} belongs to another user"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn store() -> MessageStore {
        MessageStore::new(ChatDatabase::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamp() {
        let store = store().await;
        let m = store.create("alice", "bob", "hi").await.unwrap();
        assert!(m.id > 0);
        assert!(m.created_at > 0);
        assert_eq!(m.sender, "alice");
        assert_eq!(m.recipient, "bob");
    }

    #[tokio::test]
    async fn only_sender_may_edit_or_delete() {
        let store = store().await;
        let m = store.create("alice", "bob", "hi").await.unwrap();

        for other in ["bob", "carol"] {
            assert!(matches!(
                store.edit(m.id, other, "hijacked").await,
                Err(ChatError::Unauthorized(_))
            ));
            assert!(matches!(
                store.delete(m.id, other).await,
                Err(ChatError::Unauthorized(_))
            ));
        }

        store.edit(m.id, "alice", "hello").await.unwrap();
        let thread = store.list_thread("alice", "bob").await.unwrap();
        assert_eq!(thread[0].content, "hello");

        store.delete(m.id, "alice").await.unwrap();
        assert!(store.list_thread("alice", "bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_message_is_not_found() {
        let store = store().await;
        assert!(matches!(
            store.edit(42, "alice", "x").await,
            Err(ChatError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(42, "alice").await,
            Err(ChatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn peers_come_from_both_directions() {
        let store = store().await;
        store.create("alice", "bob", "one").await.unwrap();
        store.create("carol", "alice", "two").await.unwrap();

        let peers = store.list_peers("alice").await.unwrap();
        let names: Vec<&str> = peers.iter().map(|p| p.peer.as_str()).collect();
        assert_eq!(names, vec!["carol", "bob"]);
    }
}
