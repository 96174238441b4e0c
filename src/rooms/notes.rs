use uuid::Uuid;

use super::policy::{authorize, Operation};
use crate::db::RoomRepository;
use crate::error::{RoomError, RoomResult};
use crate::models::{Note, NotePatch};

/// Note lifecycle. Every change is saved together with its parent room.
#[derive(Clone)]
pub struct NoteCollection {
    repo: RoomRepository,
}

impl NoteCollection {
    pub fn new(repo: RoomRepository) -> Self {
        Self { repo }
    }

    pub async fn create_note(
        &self,
        room_id: Uuid,
        actor_id: &str,
        title: String,
        content: String,
    ) -> RoomResult<Note> {
        let mut room = self.repo.get_by_id(room_id).await?;
        authorize(&room, actor_id, Operation::CreateNote)?;

        let note = Note::new(title, content, actor_id);
        room.notes.push(note.clone());
        self.repo.save(&mut room).await?;
        Ok(note)
    }

    pub async fn update_note(
        &self,
        room_id: Uuid,
        note_id: Uuid,
        actor_id: &str,
        patch: NotePatch,
    ) -> RoomResult<Note> {
        let mut room = self.repo.get_by_id(room_id).await?;
        authorize(&room, actor_id, Operation::UpdateNote)?;

        let note = room.notes.get_mut(note_id).ok_or(RoomError::NoteNotFound)?;
        note.apply(patch, actor_id);
        let note = note.clone();

        self.repo.save(&mut room).await?;
        Ok(note)
    }

    pub async fn delete_note(&self, room_id: Uuid, note_id: Uuid, actor_id: &str) -> RoomResult<Note> {
        let mut room = self.repo.get_by_id(room_id).await?;
        authorize(&room, actor_id, Operation::DeleteNote)?;

        let note = room.notes.remove(note_id).ok_or(RoomError::NoteNotFound)?;
        self.repo.save(&mut room).await?;
        Ok(note)
    }
}
