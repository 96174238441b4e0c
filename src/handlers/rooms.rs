use super::{ack, AuthUser};
use crate::error::RoomError;
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
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// The human-chosen slug.
    pub room_id: String,
}

pub async fn create_room(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Response, RoomError> {
    let room = state
        .rooms
        .create_room(&actor, request.name, request.description, request.room_id)
        .await?;
    Ok((StatusCode::CREATED, Json(room)).into_response())
}

pub async fn list_my_rooms(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> Result<Response, RoomError> {
    let rooms = state.rooms.list_my_rooms(&actor).await?;
    Ok(Json(rooms).into_response())
}

pub async fn get_room(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, RoomError> {
    let room = state.rooms.get_room(&actor, id).await?;
    Ok(Json(room).into_response())
}

pub async fn join_room(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(slug): Path<String>,
) -> Result<Response, RoomError> {
    let room = state.rooms.join_room(&actor, &slug).await?;
    Ok(Json(room).into_response())
}

pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, RoomError> {
    state.rooms.leave_room(&actor, id).await?;
    Ok(ack("Successfully left room").into_response())
}

pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, RoomError> {
    state.rooms.delete_room(&actor, id).await?;
    Ok(ack("Room deleted successfully").into_response())
}

pub async fn online_users(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, RoomError> {
    let users = state.rooms.online_users(&actor, id).await?;
    Ok(Json(users).into_response())
}
