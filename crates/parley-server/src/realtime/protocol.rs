//! JSON frames exchanged over the realtime channel.
//!
//! Inbound frames are decoded in two steps: the `action` discriminator is read
//! first, then the remaining fields are decoded into that action's payload.
//! Unknown discriminators decode to [`ClientAction::Unknown`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChatError, ChatResult};
use crate::storage::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    SendMessage { to: String, content: String },
    EditMessage { message_id: i64, new_content: String },
    DeleteMessage { message_id: i64 },
    Unknown(String),
}

#[derive(Deserialize)]
struct SendPayload {
    to: String,
    content: String,
}

#[derive(Deserialize)]
struct EditPayload {
    message_id: i64,
    new_content: String,
}

#[derive(Deserialize)]
struct DeletePayload {
    message_id: i64,
}

fn payload<T: serde::de::DeserializeOwned>(action: &str, value: Value) -> ChatResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ChatError::ProtocolViolation(format!("bad {action} payload: {e}")))
}

impl ClientAction {
    pub fn decode(frame: &str) -> ChatResult<Self> {
        let value: Value = serde_json::from_str(frame)
            .map_err(|e| ChatError::ProtocolViolation(format!("frame is not JSON: {e}")))?;

        let action = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| ChatError::ProtocolViolation("missing action field".into()))?
            .to_string();

        match action.as_str() {
            "send_message" => {
                let p: SendPayload = payload(&action, value)?;
                if p.to.is_empty() {
                    return Err(ChatError::ProtocolViolation("empty recipient".into()));
                }
                Ok(Self::SendMessage {
                    to: p.to,
                    content: p.content,
                })
            }
            "edit_message" => {
                let p: EditPayload = payload(&action, value)?;
                if p.new_content.is_empty() {
                    return Err(ChatError::ProtocolViolation("empty new_content".into()));
                }
                Ok(Self::EditMessage {
                    message_id: p.message_id,
                    new_content: p.new_content,
                })
            }
            "delete_message" => {
                let p: DeletePayload = payload(&action, value)?;
                Ok(Self::DeleteMessage {
                    message_id: p.message_id,
                })
            }
            _ => Ok(Self::Unknown(action)),
        }
    }
}

/// Notifications pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerEvent {
    SendMessage {
        message_id: i64,
        from: String,
        to: String,
        content: String,
        created: String,
    },
    EditMessage {
        message_id: i64,
        new_content: String,
    },
    DeleteMessage {
        message_id: i64,
    },
    /// Sent only to the connection whose action failed.
    Error {
        reason: String,
        message: String,
    },
}

impl ServerEvent {
    pub fn error(err: &ChatError) -> Self {
        Self::Error {
            reason: err.code().to_string(),
            message: err.public_message(),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&Message> for ServerEvent {
    fn from(m: &Message) -> Self {
        Self::SendMessage {
            message_id: m.id,
            from: m.sender.clone(),
            to: m.recipient.clone(),
            content: m.content.clone(),
            created: m.created_rfc3339(),
        }
    }
}
