use super::{ack, AuthUser};
use crate::error::RoomError;
use crate::models::NotePatch;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(room_id): Path<Uuid>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<Response, RoomError> {
    let note = state
        .rooms
        .create_note(&actor, room_id, request.title, request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(note)).into_response())
}

pub async fn update_note(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path((room_id, note_id)): Path<(Uuid, Uuid)>,
    Json(patch): Json<NotePatch>,
) -> Result<Response, RoomError> {
    let note = state
        .rooms
        .update_note(&actor, room_id, note_id, patch)
        .await?;
    Ok(Json(note).into_response())
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path((room_id, note_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, RoomError> {
    state.rooms.delete_note(&actor, room_id, note_id).await?;
    Ok(ack("Note deleted successfully").into_response())
}
