//! Websocket upgrade and per-connection actor.

use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::dispatcher::Dispatcher;
use crate::error::ChatError;
use crate::http::auth::bearer_token;
use crate::registry::Outbound;
use crate::state::AppState;

/// How long the writer gets to flush queued frames after the reader stops.
const WRITER_DRAIN: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// `GET /ws?token=<access>`. Authentication happens before the upgrade;
/// a bad or missing token gets a plain 401 and no socket.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsAuthQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(token) = params
        .token
        .or_else(|| bearer_token(&headers).map(str::to_string))
    else {
        warn!("Websocket upgrade without token");
        return ChatError::InvalidCredential.into_response();
    };

    let claims = match state.tokens.validate_access(&token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Websocket authentication failed");
            return e.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let username = claims.username().to_string();
    info!(username = %username, "Websocket connection authenticated");
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| run_connection(socket, username, dispatcher))
}

/// Reader loop plus a writer task fed by the connection's outbound queue.
pub async fn run_connection(socket: WebSocket, username: String, dispatcher: Dispatcher) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let conn = dispatcher.registry().register(&username, tx).await;

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let (message, last) = match frame {
                Outbound::Text(text) => (Message::Text(text.into()), false),
                Outbound::Close => (Message::Close(None), true),
            };
            if let Err(e) = ws_sender.send(message).await {
                debug!(error = %e, "Websocket send failed");
                break;
            }
            if last {
                break;
            }
        }
    });

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => dispatcher.handle_text(&conn, text.as_str()).await,
            Ok(Message::Binary(_)) => {
                warn!(username = %username, "Binary frame ignored");
            }
            // Pongs to client pings are sent by the websocket layer itself.
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(_)) => break,
            Err(e) => {
                debug!(username = %username, error = %e, "Websocket receive failed");
                break;
            }
        }
    }

    dispatcher.registry().remove(&username, &conn).await;
    conn.send(Outbound::Close);
    if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }
    info!(username = %username, connection_id = conn.id(), "Websocket connection closed");
}
