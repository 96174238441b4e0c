use std::sync::Arc;

use uuid::Uuid;

use super::store::{RoomStore, StoreError};
use super::user::UserDirectory;
use crate::error::{RoomError, RoomResult};
use crate::models::{is_valid_slug, NewRoom, NoteView, Room, RoomView, UserSummary};
use crate::rooms::policy::{authorize, Operation};

/// Loads and saves whole room aggregates.
#[derive(Clone)]
pub struct RoomRepository {
    store: Arc<dyn RoomStore>,
    users: Arc<dyn UserDirectory>,
}

impl RoomRepository {
    pub fn new(store: Arc<dyn RoomStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { store, users }
    }

    pub async fn create(
        &self,
        name: String,
        description: String,
        slug: String,
        owner_id: &str,
    ) -> RoomResult<Room> {
        if !is_valid_slug(&slug) {
            return Err(RoomError::InvalidSlug);
        }
        if self.store.find_by_slug(&slug).await?.is_some() {
            return Err(RoomError::SlugTaken);
        }

        let new_room = NewRoom {
            slug,
            name,
            description,
            owner_id: owner_id.to_string(),
        };
        // The unique index still decides when two creates race on one slug.
        match self.store.insert(new_room).await {
            Ok(room) => Ok(room),
            Err(StoreError::DuplicateSlug(_)) => Err(RoomError::SlugTaken),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> RoomResult<Room> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(RoomError::RoomNotFound)
    }

    pub async fn get_by_slug(&self, slug: &str) -> RoomResult<Room> {
        self.store
            .find_by_slug(slug)
            .await?
            .ok_or(RoomError::RoomNotFound)
    }

    pub async fn list_visible_to(&self, user_id: &str) -> RoomResult<Vec<Room>> {
        Ok(self.store.find_for_user(user_id).await?)
    }

    /// Persists the whole aggregate. Fails if the room was deleted meanwhile.
    pub async fn save(&self, room: &mut Room) -> RoomResult<()> {
        room.touch();
        if self.store.save(room).await? {
            Ok(())
        } else {
            Err(RoomError::RoomNotFound)
        }
    }

    /// Deletes the room and, with it, all of its notes.
    pub async fn delete(&self, id: Uuid, requester_id: &str) -> RoomResult<Room> {
        let room = self.get_by_id(id).await?;
        authorize(&room, requester_id, Operation::DeleteRoom)?;

        if !self.store.remove(id).await? {
            return Err(RoomError::RoomNotFound);
        }
        Ok(room)
    }

    pub async fn remember_user(&self, user_id: &str, username: &str) {
        self.users.remember(user_id, username).await;
    }

    /// Resolves owner, members and note editors into user summaries.
    pub async fn hydrate(&self, room: Room) -> RoomResult<RoomView> {
        let mut ids: Vec<String> = Vec::with_capacity(room.members.len() + room.notes.len() + 1);
        ids.push(room.owner_id.clone());
        ids.extend(room.members.iter().cloned());
        ids.extend(room.notes.iter().map(|n| n.updated_by.clone()));
        ids.sort();
        ids.dedup();

        let users = self.users.lookup(&ids).await?;
        let resolve = |id: &str| {
            users
                .get(id)
                .cloned()
                .unwrap_or_else(|| UserSummary::unresolved(id))
        };

        Ok(RoomView {
            id: room.id,
            owner: resolve(&room.owner_id),
            members: room.members.iter().map(|m| resolve(m)).collect(),
            notes: room
                .notes
                .iter()
                .map(|n| NoteView {
                    id: n.id,
                    title: n.title.clone(),
                    content: n.content.clone(),
                    last_updated: n.last_updated,
                    updated_by: resolve(&n.updated_by),
                })
                .collect(),
            slug: room.slug,
            name: room.name,
            description: room.description,
            created_at: room.created_at,
            updated_at: room.updated_at,
        })
    }
}
