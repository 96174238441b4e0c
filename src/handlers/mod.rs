mod notes;
mod rooms;
mod ws;

use crate::error::{ErrorKind, RoomError};
use crate::rooms::Actor;
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use std::sync::Arc;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USERNAME_HEADER: &str = "x-username";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rooms", post(rooms::create_room))
        .route("/api/rooms/available", get(rooms::list_my_rooms))
        .route("/api/rooms/join/:slug", post(rooms::join_room))
        .route("/api/rooms/:id", get(rooms::get_room).delete(rooms::delete_room))
        .route("/api/rooms/:id/leave", post(rooms::leave_room))
        .route("/api/rooms/:id/online", get(rooms::online_users))
        .route("/api/rooms/:id/notes", post(notes::create_note))
        .route(
            "/api/rooms/:id/notes/:note_id",
            put(notes::update_note).delete(notes::delete_note),
        )
        .route("/api/ws", get(ws::room_ws))
}

/// The caller as verified by the auth gateway in front of this service.
///
/// The gateway checks the credential and forwards the user's id and name
/// as headers; requests without them are rejected.
pub struct AuthUser(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        match (header(USER_ID_HEADER), header(USERNAME_HEADER)) {
            (Some(user_id), Some(username)) => Ok(AuthUser(Actor { user_id, username })),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Access denied" })),
            )
                .into_response()),
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = if kind == ErrorKind::Internal {
            tracing::error!("Error handling command: {}", self);
            "Server error".to_string()
        } else {
            tracing::warn!("Command rejected: {}", self);
            self.to_string()
        };

        (status_for(kind), Json(json!({ "message": message }))).into_response()
    }
}

/// Body for commands that only acknowledge.
fn ack(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<AuthUser, Response> {
        let (mut parts, _) = request.into_parts();
        AuthUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_auth_user_from_headers() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "u1")
            .header(USERNAME_HEADER, "alice")
            .body(())
            .unwrap();
        let AuthUser(actor) = extract(request).await.ok().unwrap();
        assert_eq!(actor, Actor::new("u1", "alice"));
    }

    #[tokio::test]
    async fn test_auth_user_rejects_missing_identity() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "u1")
            .header(USERNAME_HEADER, "  ")
            .body(())
            .unwrap();
        let rejection = extract(request).await.err().unwrap();
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(RoomError::InvalidSlug.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(RoomError::SlugTaken.into_response().status(), StatusCode::CONFLICT);
        assert_eq!(RoomError::RoomNotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(RoomError::OwnerCannotLeave.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            RoomError::Store(crate::db::StoreError::Database(sqlx::Error::PoolTimedOut))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
