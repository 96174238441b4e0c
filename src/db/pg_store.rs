use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{RoomStore, StoreError};
use crate::models::{NewRoom, Room};

/// Rooms stored as JSONB documents, one row per aggregate.
pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(err: sqlx::Error, slug: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::DuplicateSlug(slug.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn insert(&self, room: NewRoom) -> Result<Room, StoreError> {
        let room = room.into_room(Uuid::new_v4());
        sqlx::query(
            "INSERT INTO rooms (id, slug, document, updated_at)
             VALUES ($1, $2, $3, $4)"
        )
        .bind(room.id)
        .bind(&room.slug)
        .bind(Json(&room))
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &room.slug))?;
        Ok(room)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Room>>("SELECT document FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(room)| room))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Room>>("SELECT document FROM rooms WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(room)| room))
    }

    async fn find_for_user(&self, user_id: &str) -> Result<Vec<Room>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Room>>(
            "SELECT document FROM rooms
             WHERE document->>'ownerId' = $1 OR document->'members' ? $1
             ORDER BY document->>'createdAt'"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(room)| room).collect())
    }

    async fn save(&self, room: &Room) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE rooms SET document = $1, updated_at = $2 WHERE id = $3")
            .bind(Json(room))
            .bind(room.updated_at)
            .bind(room.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
