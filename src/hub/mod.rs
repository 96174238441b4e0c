//! Topic-keyed fan-out of room events to connected sessions.
//!
//! One topic per room id. Delivery is best-effort and at-most-once: there is
//! no backlog, so a session that is not attached when an event is published
//! never sees it and has to re-fetch the room.

pub mod event;
pub mod session;

pub use event::HubEvent;
pub use session::{EventSink, SessionId, SessionInfo};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::UserSummary;
use session::SessionEntry;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HubError {
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    #[error("session {0} is not attached to room {1}")]
    NotAttached(SessionId, Uuid),

    #[error("room {0} has been closed")]
    TopicClosed(Uuid),
}

/// Snapshot of the hub's delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub sessions: usize,
    pub topics: usize,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<SessionId, SessionEntry>,
    topics: HashMap<Uuid, HashSet<SessionId>>,
    // Rooms that were deleted. Room ids are never reused.
    closed: HashSet<Uuid>,
}

impl HubState {
    fn release(&mut self, session_id: SessionId) -> Vec<Uuid> {
        let Some(entry) = self.sessions.get_mut(&session_id) else {
            return Vec::new();
        };
        let rooms: Vec<Uuid> = entry.topics.drain().collect();
        for room_id in &rooms {
            self.unlink(session_id, *room_id);
        }
        rooms
    }

    fn unlink(&mut self, session_id: SessionId, room_id: Uuid) {
        if let Some(subscribers) = self.topics.get_mut(&room_id) {
            subscribers.remove(&session_id);
            if subscribers.is_empty() {
                self.topics.remove(&room_id);
            }
        }
    }
}

#[derive(Default)]
pub struct RealtimeHub {
    state: RwLock<HubState>,
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the maps half-updated in a
    // way later calls depend on, so a poisoned lock is still used.
    fn read(&self) -> RwLockReadGuard<'_, HubState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HubState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a session with its own sink. It starts attached to nothing.
    pub fn connect(&self, user_id: &str, username: &str, sink: Arc<dyn EventSink>) -> SessionInfo {
        let info = SessionInfo {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            username: username.to_string(),
        };
        self.write().sessions.insert(
            info.id,
            SessionEntry {
                info: info.clone(),
                sink,
                topics: HashSet::new(),
            },
        );
        tracing::debug!("Session {} connected for user {}", info.id, info.user_id);
        info
    }

    /// Connects a session whose events arrive on an unbounded channel.
    pub fn subscribe(
        &self,
        user_id: &str,
        username: &str,
    ) -> (SessionInfo, mpsc::UnboundedReceiver<HubEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let info = self.connect(user_id, username, Arc::new(tx));
        (info, rx)
    }

    /// Attaches the session to the room's topic and announces it to the
    /// other sessions there. Attaching twice announces once.
    pub fn attach(&self, session_id: SessionId, room_id: Uuid) -> Result<(), HubError> {
        let info = {
            let mut state = self.write();
            if state.closed.contains(&room_id) {
                return Err(HubError::TopicClosed(room_id));
            }
            let entry = state
                .sessions
                .get_mut(&session_id)
                .ok_or(HubError::UnknownSession(session_id))?;
            if !entry.topics.insert(room_id) {
                return Ok(());
            }
            let info = entry.info.clone();
            state.topics.entry(room_id).or_default().insert(session_id);
            info
        };
        tracing::debug!("Session {} attached to room {}", session_id, room_id);

        self.publish(
            HubEvent::UserJoined {
                room_id,
                user_id: info.user_id,
                username: info.username,
            },
            Some(session_id),
        );
        Ok(())
    }

    /// Returns whether the session was attached to the room.
    pub fn detach(&self, session_id: SessionId, room_id: Uuid) -> Result<bool, HubError> {
        let mut state = self.write();
        let entry = state
            .sessions
            .get_mut(&session_id)
            .ok_or(HubError::UnknownSession(session_id))?;
        let was_attached = entry.topics.remove(&room_id);
        state.unlink(session_id, room_id);
        if was_attached {
            tracing::debug!("Session {} detached from room {}", session_id, room_id);
        }
        Ok(was_attached)
    }

    /// Detaches every session the user holds on the room, e.g. after the
    /// user lost access to it. Returns the detached sessions.
    pub fn detach_user(&self, user_id: &str, room_id: Uuid) -> Vec<SessionId> {
        let mut state = self.write();
        let Some(subscribers) = state.topics.get(&room_id) else {
            return Vec::new();
        };
        let owned: Vec<SessionId> = subscribers
            .iter()
            .filter(|id| {
                state
                    .sessions
                    .get(*id)
                    .is_some_and(|entry| entry.info.user_id == user_id)
            })
            .copied()
            .collect();

        for session_id in &owned {
            if let Some(entry) = state.sessions.get_mut(session_id) {
                entry.topics.remove(&room_id);
            }
            state.unlink(*session_id, room_id);
        }
        if !owned.is_empty() {
            tracing::debug!(
                "Detached {} session(s) of user {} from room {}",
                owned.len(),
                user_id,
                room_id
            );
        }
        owned
    }

    /// Removes the session from every topic and returns the rooms it left.
    pub fn detach_all(&self, session_id: SessionId) -> Vec<Uuid> {
        self.write().release(session_id)
    }

    /// Drops the session entirely and tells each room it was attached to
    /// that the user left. Events published afterwards never reach it.
    pub fn disconnect(&self, session_id: SessionId) -> Option<SessionInfo> {
        let (info, rooms) = {
            let mut state = self.write();
            let rooms = state.release(session_id);
            let entry = state.sessions.remove(&session_id)?;
            (entry.info, rooms)
        };

        for room_id in rooms {
            self.publish(
                HubEvent::UserLeft {
                    room_id,
                    user_id: info.user_id.clone(),
                    username: info.username.clone(),
                },
                Some(session_id),
            );
        }
        tracing::debug!("Session {} disconnected", session_id);
        Some(info)
    }

    /// Delivers the event to every session attached to its room, except
    /// `exclude`. Returns how many sessions accepted it.
    pub fn publish(&self, event: HubEvent, exclude: Option<SessionId>) -> usize {
        let room_id = event.room_id();
        let state = self.read();
        self.published.fetch_add(1, Ordering::Relaxed);

        let Some(subscribers) = state.topics.get(&room_id) else {
            tracing::debug!("No sessions attached to room {} for {}", room_id, event.kind());
            return 0;
        };

        let mut delivered = 0;
        for session_id in subscribers {
            if Some(*session_id) == exclude {
                continue;
            }
            let Some(entry) = state.sessions.get(session_id) else {
                continue;
            };
            if entry.sink.deliver(&event) {
                delivered += 1;
            } else {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "Dropped {} for session {} in room {}",
                    event.kind(),
                    session_id,
                    room_id
                );
            }
        }

        self.delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        tracing::debug!("Published {} to {} session(s) in room {}", event.kind(), delivered, room_id);
        delivered
    }

    /// Relays a live edit from one session to the rest of the topic. Only
    /// sessions attached to the room may relay into it.
    pub fn relay_live_edit(
        &self,
        session_id: SessionId,
        room_id: Uuid,
        content: String,
    ) -> Result<usize, HubError> {
        let user_id = {
            let state = self.read();
            let entry = state
                .sessions
                .get(&session_id)
                .ok_or(HubError::UnknownSession(session_id))?;
            if !entry.topics.contains(&room_id) {
                return Err(HubError::NotAttached(session_id, room_id));
            }
            entry.info.user_id.clone()
        };

        Ok(self.publish(
            HubEvent::NoteLiveEdit {
                room_id,
                user_id,
                content,
            },
            Some(session_id),
        ))
    }

    /// Detaches every session from a room that no longer exists. Later
    /// attaches to it are refused.
    pub fn close_topic(&self, room_id: Uuid) -> usize {
        let mut state = self.write();
        state.closed.insert(room_id);
        let Some(subscribers) = state.topics.remove(&room_id) else {
            return 0;
        };
        for session_id in &subscribers {
            if let Some(entry) = state.sessions.get_mut(session_id) {
                entry.topics.remove(&room_id);
            }
        }
        subscribers.len()
    }

    pub fn is_attached(&self, session_id: SessionId, room_id: Uuid) -> bool {
        self.read()
            .topics
            .get(&room_id)
            .is_some_and(|s| s.contains(&session_id))
    }

    /// Distinct users with at least one session attached to the room.
    pub fn online_users(&self, room_id: Uuid) -> Vec<UserSummary> {
        let state = self.read();
        let mut users: Vec<UserSummary> = Vec::new();
        for session_id in state.topics.get(&room_id).into_iter().flatten() {
            let Some(entry) = state.sessions.get(session_id) else {
                continue;
            };
            if users.iter().all(|u| u.id != entry.info.user_id) {
                users.push(UserSummary::new(
                    entry.info.user_id.clone(),
                    entry.info.username.clone(),
                ));
            }
        }
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    pub fn stats(&self) -> HubStats {
        let state = self.read();
        HubStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sessions: state.sessions.len(),
            topics: state.topics.len(),
        }
    }
}
