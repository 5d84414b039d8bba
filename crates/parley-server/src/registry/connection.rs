//! In-memory registry of live websocket connections, one per user.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Frames queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Sending half of one live connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: u64,
    username: String,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub fn new(username: String, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            username,
            tx,
        }
    }

    /// Process-unique id; two handles for the same user never share one.
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Queue a frame. Returns false (and logs) if the writer is gone.
    pub fn send(&self, frame: Outbound) -> bool {
        if self.tx.send(frame).is_err() {
            warn!(
                username = %self.username,
                connection_id = self.id,
                "Delivery failed, connection writer closed"
            );
            return false;
        }
        true
    }
}

/// Thread-safe map from username to that user's current connection.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<String, Arc<ConnectionHandle>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `username`, superseding any previous one.
    /// The superseded transport is left open.
    pub async fn register(
        &self,
        username: &str,
        tx: mpsc::UnboundedSender<Outbound>,
    ) -> Arc<ConnectionHandle> {
        let conn = Arc::new(ConnectionHandle::new(username.to_string(), tx));
        let previous = self
            .connections
            .write()
            .await
            .insert(username.to_string(), Arc::clone(&conn));

        if let Some(previous) = previous {
            info!(
                username = %username,
                connection_id = conn.id,
                superseded = previous.id,
                "Connection registered, replacing previous"
            );
        } else {
            info!(username = %username, connection_id = conn.id, "Connection registered");
        }
        conn
    }

    pub async fn lookup(&self, username: &str) -> Option<Arc<ConnectionHandle>> {
        self.connections.read().await.get(username).cloned()
    }

    /// Remove `username` only if it still maps to `conn`.
    pub async fn remove(&self, username: &str, conn: &ConnectionHandle) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(username) {
            Some(current) if current.id == conn.id => {
                connections.remove(username);
                info!(username = %username, connection_id = conn.id, "Connection unregistered");
                true
            }
            Some(current) => {
                debug!(
                    username = %username,
                    connection_id = conn.id,
                    current = current.id,
                    "Stale connection not removed"
                );
                false
            }
            None => false,
        }
    }

    /// Every live connection, for global fan-out.
    pub async fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.read().await.values().cloned().collect()
    }

    pub async fn is_connected(&self, username: &str) -> bool {
        self.connections.read().await.contains_key(username)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let conn = registry.register("alice", tx).await;

        assert!(registry.is_connected("alice").await);
        assert!(!registry.is_connected("bob").await);
        let found = registry.lookup("alice").await.unwrap();
        assert_eq!(found.id(), conn.id());
        assert_eq!(found.username(), "alice");
    }

    #[tokio::test]
    async fn reconnect_supersedes_and_stale_remove_is_a_noop() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let first = registry.register("alice", tx1).await;
        let second = registry.register("alice", tx2).await;
        assert_ne!(first.id(), second.id());
        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(registry.lookup("alice").await.unwrap().id(), second.id());

        assert!(!registry.remove("alice", &first).await);
        assert_eq!(registry.lookup("alice").await.unwrap().id(), second.id());

        assert!(registry.remove("alice", &second).await);
        assert!(registry.lookup("alice").await.is_none());
    }

    #[tokio::test]
    async fn remove_unknown_user_returns_false() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = ConnectionHandle::new("ghost".into(), tx);
        assert!(!registry.remove("ghost", &conn).await);
    }

    #[tokio::test]
    async fn snapshot_lists_every_user() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        registry.register("alice", tx1).await;
        registry.register("bob", tx2).await;

        let mut names: Vec<String> = registry
            .snapshot()
            .await
            .iter()
            .map(|c| c.username().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn send_reports_closed_writer() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = ConnectionHandle::new("alice".into(), tx);

        drop(rx);
        assert!(!conn.send(Outbound::Text("hi".into())));
    }

    #[tokio::test]
    async fn superseded_connection_still_receives_direct_sends() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let first = registry.register("alice", tx1).await;
        registry.register("alice", tx2).await;

        assert!(first.send(Outbound::Text("still open".into())));
        assert_eq!(rx1.recv().await, Some(Outbound::Text("still open".into())));
    }
}
