use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::note::Notes;

pub const SLUG_MIN_LEN: usize = 4;
pub const SLUG_MAX_LEN: usize = 20;

/// A room document: identity, ownership, membership and its notes.
///
/// The whole struct is persisted as one unit; notes never live outside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub members: Vec<String>,
    pub notes: Notes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a room is created, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
}

impl NewRoom {
    pub fn into_room(self, id: Uuid) -> Room {
        let now = Utc::now();
        Room {
            id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            members: vec![self.owner_id.clone()],
            owner_id: self.owner_id,
            notes: Notes::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Room {
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// The owner counts as a member even if the member list was tampered with.
    pub fn is_member(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.members.iter().any(|m| m == user_id)
    }

    /// Appends a member. Returns false if already present.
    pub fn add_member(&mut self, user_id: &str) -> bool {
        if self.is_member(user_id) {
            return false;
        }
        self.members.push(user_id.to_string());
        true
    }

    /// Removes a non-owner member, keeping the order of the others.
    pub fn remove_member(&mut self, user_id: &str) -> bool {
        if self.is_owner(user_id) {
            return false;
        }
        let before = self.members.len();
        self.members.retain(|m| m != user_id);
        self.members.len() != before
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Slugs are 4-20 ASCII letters or digits.
pub fn is_valid_slug(slug: &str) -> bool {
    (SLUG_MIN_LEN..=SLUG_MAX_LEN).contains(&slug.len())
        && slug.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room {
        NewRoom {
            slug: "TEAM01".to_string(),
            name: "Team".to_string(),
            description: "".to_string(),
            owner_id: "u1".to_string(),
        }
        .into_room(Uuid::new_v4())
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("TEAM01"));
        assert!(is_valid_slug("abcd"));
        assert!(is_valid_slug("a1B2c3D4e5F6g7H8i9J0"));
        assert!(!is_valid_slug("abc"));
        assert!(!is_valid_slug("a1B2c3D4e5F6g7H8i9J0x"));
        assert!(!is_valid_slug("team-01"));
        assert!(!is_valid_slug("team 01"));
        assert!(!is_valid_slug("téam01"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_new_room_has_owner_as_only_member() {
        let room = room();
        assert_eq!(room.members, vec!["u1".to_string()]);
        assert!(room.notes.is_empty());
        assert!(room.is_owner("u1"));
        assert!(room.is_member("u1"));
    }

    #[test]
    fn test_membership_changes_preserve_order() {
        let mut room = room();
        assert!(room.add_member("u2"));
        assert!(room.add_member("u3"));
        assert!(room.add_member("u4"));
        assert!(!room.add_member("u3"));

        assert!(room.remove_member("u3"));
        assert_eq!(room.members, vec!["u1", "u2", "u4"]);
        assert!(!room.remove_member("u3"));
    }

    #[test]
    fn test_owner_is_never_removed() {
        let mut room = room();
        assert!(!room.remove_member("u1"));
        assert!(room.is_member("u1"));
    }
}
