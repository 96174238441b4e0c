use super::AuthUser;
use crate::hub::SessionInfo;
use crate::rooms::Actor;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Frames a client may send over the realtime socket.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Attach { room_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Detach { room_id: Uuid },
    #[serde(rename_all = "camelCase")]
    LiveEdit { room_id: Uuid, content: String },
}

/// Upgrades to a hub session. The session's identity is the verified
/// caller of the upgrade request, never something the client sends later.
pub async fn room_ws(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(state, actor, socket))
}

async fn run_session(state: Arc<AppState>, actor: Actor, socket: WebSocket) {
    let hub = state.rooms.hub().clone();
    let (session, mut rx) = hub.subscribe(&actor.user_id, &actor.username);
    let (mut sender, mut receiver) = socket.split();

    let mut forward_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to encode {}: {}", event.kind(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let receive_state = state.clone();
    let receive_session = session.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) else {
                tracing::debug!("Ignoring malformed frame from session {}", receive_session.id);
                continue;
            };
            handle_client_message(&receive_state, &actor, &receive_session, msg).await;
        }
    });

    tokio::select! {
        _ = &mut forward_task => receive_task.abort(),
        _ = &mut receive_task => forward_task.abort(),
    };

    hub.disconnect(session.id);
    let stats = hub.stats();
    tracing::debug!(
        "Session {} closed ({} sessions, {} delivered, {} dropped)",
        session.id,
        stats.sessions,
        stats.delivered,
        stats.dropped
    );
}

async fn handle_client_message(
    state: &AppState,
    actor: &Actor,
    session: &SessionInfo,
    msg: ClientMessage,
) {
    let hub = state.rooms.hub();
    match msg {
        ClientMessage::Attach { room_id } => {
            if let Err(e) = state.rooms.attach_session(actor, session.id, room_id).await {
                tracing::warn!("Session {} could not attach to room {}: {}", session.id, room_id, e);
            }
        }
        ClientMessage::Detach { room_id } => {
            if let Ok(false) = hub.detach(session.id, room_id) {
                tracing::debug!("Session {} was not attached to room {}", session.id, room_id);
            }
        }
        ClientMessage::LiveEdit { room_id, content } => {
            if let Err(e) = hub.relay_live_edit(session.id, room_id, content) {
                tracing::debug!("Live edit not relayed: {}", e);
            }
        }
    }
}
