use crate::db::StoreError;
use crate::hub::HubError;

/// Coarse classification of a failed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Room ID must be 4-20 characters long and contain only letters and numbers")]
    InvalidSlug,

    #[error("Room ID is already taken")]
    SlugTaken,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Note not found")]
    NoteNotFound,

    #[error("Already a member")]
    AlreadyMember,

    #[error("Not a member of this room")]
    NotMember,

    #[error("Room owner cannot leave the room")]
    OwnerCannotLeave,

    #[error("{0}")]
    NotOwner(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Session(#[from] HubError),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoomError::InvalidSlug => ErrorKind::Validation,
            RoomError::SlugTaken | RoomError::AlreadyMember => ErrorKind::Conflict,
            RoomError::RoomNotFound | RoomError::NoteNotFound => ErrorKind::NotFound,
            RoomError::NotMember
            | RoomError::OwnerCannotLeave
            | RoomError::NotOwner(_)
            | RoomError::Forbidden(_) => ErrorKind::Forbidden,
            RoomError::Store(StoreError::DuplicateSlug(_)) => ErrorKind::Conflict,
            RoomError::Store(_) => ErrorKind::Internal,
            RoomError::Session(HubError::UnknownSession(_))
            | RoomError::Session(HubError::TopicClosed(_)) => ErrorKind::NotFound,
            RoomError::Session(HubError::NotAttached(..)) => ErrorKind::Forbidden,
        }
    }
}

pub type RoomResult<T> = Result<T, RoomError>;
