use serde::Serialize;
use uuid::Uuid;

use crate::models::Note;

/// Everything the hub can fan out to a room topic.
///
/// Serialized as `{"kind": "note-created", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum HubEvent {
    #[serde(rename_all = "camelCase")]
    UserJoined {
        room_id: Uuid,
        user_id: String,
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        room_id: Uuid,
        user_id: String,
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    NoteCreated { room_id: Uuid, note: Note },
    #[serde(rename_all = "camelCase")]
    NoteUpdated {
        room_id: Uuid,
        note_id: Uuid,
        note: Note,
    },
    #[serde(rename_all = "camelCase")]
    NoteDeleted { room_id: Uuid, note_id: Uuid },
    #[serde(rename_all = "camelCase")]
    RoomDeleted { room_id: Uuid },
    /// Ephemeral relay between sessions; never persisted.
    #[serde(rename_all = "camelCase")]
    NoteLiveEdit {
        room_id: Uuid,
        user_id: String,
        content: String,
    },
}

impl HubEvent {
    pub fn room_id(&self) -> Uuid {
        match self {
            HubEvent::UserJoined { room_id, .. }
            | HubEvent::UserLeft { room_id, .. }
            | HubEvent::NoteCreated { room_id, .. }
            | HubEvent::NoteUpdated { room_id, .. }
            | HubEvent::NoteDeleted { room_id, .. }
            | HubEvent::RoomDeleted { room_id }
            | HubEvent::NoteLiveEdit { room_id, .. } => *room_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HubEvent::UserJoined { .. } => "user-joined",
            HubEvent::UserLeft { .. } => "user-left",
            HubEvent::NoteCreated { .. } => "note-created",
            HubEvent::NoteUpdated { .. } => "note-updated",
            HubEvent::NoteDeleted { .. } => "note-deleted",
            HubEvent::RoomDeleted { .. } => "room-deleted",
            HubEvent::NoteLiveEdit { .. } => "note-live-edit",
        }
    }
}
