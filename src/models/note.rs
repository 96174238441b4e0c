use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub last_updated: DateTime<Utc>,
    /// Only the most recent editor is kept.
    pub updated_by: String,
}

impl Note {
    pub fn new(title: String, content: String, author_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            last_updated: Utc::now(),
            updated_by: author_id.to_string(),
        }
    }

    /// Applies a partial update. Blank fields keep the previous value; the
    /// editor and timestamp are refreshed unconditionally.
    pub fn apply(&mut self, patch: NotePatch, editor_id: &str) {
        if let Some(title) = patch.title.filter(|t| !t.is_empty()) {
            self.title = title;
        }
        if let Some(content) = patch.content.filter(|c| !c.is_empty()) {
            self.content = content;
        }

        let now = Utc::now();
        self.last_updated = if now > self.last_updated {
            now
        } else {
            self.last_updated + Duration::milliseconds(1)
        };
        self.updated_by = editor_id.to_string();
    }
}

/// Partial note update; `None` and `""` both mean "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// The ordered notes of one room. Ids are unique within the collection only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notes(Vec<Note>);

impl Notes {
    pub fn push(&mut self, note: Note) {
        self.0.push(note);
    }

    pub fn get(&self, id: Uuid) -> Option<&Note> {
        self.0.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Note> {
        self.0.iter_mut().find(|n| n.id == id)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.0.iter().position(|n| n.id == id)
    }

    /// Removes by index lookup; later notes shift down so creation order holds.
    pub fn remove(&mut self, id: Uuid) -> Option<Note> {
        let index = self.position(id)?;
        Some(self.0.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
