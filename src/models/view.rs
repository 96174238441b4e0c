use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::UserSummary;

/// Read model of a room with every user reference resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub owner: UserSummary,
    pub members: Vec<UserSummary>,
    pub notes: Vec<NoteView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub last_updated: DateTime<Utc>,
    pub updated_by: UserSummary,
}
