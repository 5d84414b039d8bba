//! Applies decoded client actions and fans the results out.

use tracing::{debug, instrument, warn};

use super::protocol::{ClientAction, ServerEvent};
use crate::chat::MessageStore;
use crate::error::ChatResult;
use crate::registry::{ConnectionHandle, ConnectionRegistry, Outbound};

#[derive(Clone)]
pub struct Dispatcher {
    registry: ConnectionRegistry,
    store: MessageStore,
}

impl Dispatcher {
    pub const fn new(registry: ConnectionRegistry, store: MessageStore) -> Self {
        Self { registry, store }
    }

    pub const fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Handle one inbound text frame. Never fails: bad frames are logged and
    /// dropped, failed actions are reported back to `conn` only.
    #[instrument(skip_all, fields(username = %conn.username(), connection_id = conn.id()))]
    pub async fn handle_text(&self, conn: &ConnectionHandle, frame: &str) {
        let action = match ClientAction::decode(frame) {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return;
            }
        };

        if let Err(e) = self.apply(conn, action).await {
            warn!(error = %e, "Action failed");
            deliver(conn, &ServerEvent::error(&e));
        }
    }

    async fn apply(&self, conn: &ConnectionHandle, action: ClientAction) -> ChatResult<()> {
        let me = conn.username();
        match action {
            ClientAction::SendMessage { to, content } => {
                let message = self.store.create(me, &to, &content).await?;
                let event = ServerEvent::from(&message);

                match self.registry.lookup(&to).await {
                    Some(peer) if peer.id() != conn.id() => deliver(&peer, &event),
                    Some(_) => {}
                    None => debug!(to = %to, "Recipient offline"),
                }
                deliver(conn, &event);
            }
            ClientAction::EditMessage {
                message_id,
                new_content,
            } => {
                self.store.edit(message_id, me, &new_content).await?;
                self.broadcast(&ServerEvent::EditMessage {
                    message_id,
                    new_content,
                })
                .await;
            }
            ClientAction::DeleteMessage { message_id } => {
                self.store.delete(message_id, me).await?;
                self.broadcast(&ServerEvent::DeleteMessage { message_id })
                    .await;
            }
            ClientAction::Unknown(name) => {
                warn!(action = %name, "Ignoring unknown action");
            }
        }
        Ok(())
    }

    /// Deliver to every registered connection.
    async fn broadcast(&self, event: &ServerEvent) {
        let frame = match event.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to encode broadcast");
                return;
            }
        };
        for conn in self.registry.snapshot().await {
            conn.send(Outbound::Text(frame.clone()));
        }
    }
}

fn deliver(conn: &ConnectionHandle, event: &ServerEvent) {
    match event.encode() {
        Ok(frame) => {
            conn.send(Outbound::Text(frame));
        }
        Err(e) => warn!(error = %e, "Failed to encode event"),
    }
}
