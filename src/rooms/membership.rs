use uuid::Uuid;

use super::policy::{authorize, Operation};
use crate::db::RoomRepository;
use crate::error::RoomResult;
use crate::models::Room;

/// Join and leave, each persisted as a whole-room write.
#[derive(Clone)]
pub struct MembershipManager {
    repo: RoomRepository,
}

impl MembershipManager {
    pub fn new(repo: RoomRepository) -> Self {
        Self { repo }
    }

    pub async fn join(&self, slug: &str, user_id: &str) -> RoomResult<Room> {
        let mut room = self.repo.get_by_slug(slug).await?;
        authorize(&room, user_id, Operation::JoinRoom)?;

        room.add_member(user_id);
        self.repo.save(&mut room).await?;
        Ok(room)
    }

    pub async fn leave(&self, room_id: Uuid, user_id: &str) -> RoomResult<Room> {
        let mut room = self.repo.get_by_id(room_id).await?;
        authorize(&room, user_id, Operation::LeaveRoom)?;

        room.remove_member(user_id);
        self.repo.save(&mut room).await?;
        Ok(room)
    }
}
