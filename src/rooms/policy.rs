//! Who may do what to a room.
//!
//! Pure decisions over the room as loaded; nothing here touches the store.

use crate::error::{RoomError, RoomResult};
use crate::models::Room;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ReadRoom,
    CreateNote,
    UpdateNote,
    DeleteNote,
    JoinRoom,
    LeaveRoom,
    DeleteRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Owner or member.
    Member,
    /// The owner alone.
    Owner,
    /// A member who is not the owner.
    NonOwnerMember,
    /// Anyone authenticated who is not yet a member.
    Outsider,
}

impl Operation {
    pub fn required(self) -> Capability {
        match self {
            Operation::ReadRoom | Operation::CreateNote | Operation::UpdateNote => {
                Capability::Member
            }
            Operation::DeleteNote | Operation::DeleteRoom => Capability::Owner,
            Operation::LeaveRoom => Capability::NonOwnerMember,
            Operation::JoinRoom => Capability::Outsider,
        }
    }
}

pub fn authorize(room: &Room, actor_id: &str, op: Operation) -> RoomResult<()> {
    let is_owner = room.is_owner(actor_id);
    let is_member = room.is_member(actor_id);

    match op.required() {
        Capability::Member if is_member => Ok(()),
        Capability::Member => Err(RoomError::Forbidden("Access denied")),

        Capability::Owner if is_owner => Ok(()),
        Capability::Owner => Err(RoomError::NotOwner(match op {
            Operation::DeleteNote => "Only room owner can delete notes",
            _ => "Only room owner can delete the room",
        })),

        Capability::NonOwnerMember if is_owner => Err(RoomError::OwnerCannotLeave),
        Capability::NonOwnerMember if is_member => Ok(()),
        Capability::NonOwnerMember => Err(RoomError::NotMember),

        Capability::Outsider if is_member => Err(RoomError::AlreadyMember),
        Capability::Outsider => Ok(()),
    }
}
