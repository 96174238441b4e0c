use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{NewRoom, Room};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("slug `{0}` is already in use")]
    DuplicateSlug(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Document store for room aggregates, keyed by id with a unique slug index.
///
/// Every write replaces the whole document. There is no version check, so
/// two concurrent read-modify-write cycles on one room can lose an update.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Assigns the internal id and persists the room.
    async fn insert(&self, room: NewRoom) -> Result<Room, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Room>, StoreError>;

    /// Rooms the user owns or belongs to.
    async fn find_for_user(&self, user_id: &str) -> Result<Vec<Room>, StoreError>;

    /// Replaces the stored document. Returns false if it no longer exists.
    async fn save(&self, room: &Room) -> Result<bool, StoreError>;

    /// Deletes the document and everything embedded in it.
    async fn remove(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// In-process store used when no database is configured.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<Uuid, Room>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn insert(&self, room: NewRoom) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.write().await;
        if rooms.values().any(|r| r.slug == room.slug) {
            return Err(StoreError::DuplicateSlug(room.slug));
        }

        let room = room.into_room(Uuid::new_v4());
        rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.read().await.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Room>, StoreError> {
        Ok(self
            .rooms
            .read()
            .await
            .values()
            .find(|r| r.slug == slug)
            .cloned())
    }

    async fn find_for_user(&self, user_id: &str) -> Result<Vec<Room>, StoreError> {
        let mut rooms: Vec<Room> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|r| r.is_member(user_id))
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.created_at);
        Ok(rooms)
    }

    async fn save(&self, room: &Room) -> Result<bool, StoreError> {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(&room.id) {
            Some(stored) => {
                *stored = room.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.rooms.write().await.remove(&id).is_some())
    }
}
