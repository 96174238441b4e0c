pub mod membership;
pub mod notes;
pub mod policy;

pub use membership::MembershipManager;
pub use notes::NoteCollection;

use std::sync::Arc;

use uuid::Uuid;

use crate::db::RoomRepository;
use crate::error::RoomResult;
use crate::hub::{HubEvent, RealtimeHub, SessionId};
use crate::models::{Note, NotePatch, Room, RoomView, UserSummary};
use policy::{authorize, Operation};

/// The authenticated caller of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub username: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}

/// One call per external command: authorize, mutate, persist, then publish.
///
/// Events go out only after the store accepted the write. If the process
/// dies between the two, the write stands and nobody is told; attached
/// sessions catch up on their next fetch.
#[derive(Clone)]
pub struct RoomService {
    repo: RoomRepository,
    membership: MembershipManager,
    notes: NoteCollection,
    hub: Arc<RealtimeHub>,
}

impl RoomService {
    pub fn new(repo: RoomRepository, hub: Arc<RealtimeHub>) -> Self {
        Self {
            membership: MembershipManager::new(repo.clone()),
            notes: NoteCollection::new(repo.clone()),
            repo,
            hub,
        }
    }

    pub fn hub(&self) -> &Arc<RealtimeHub> {
        &self.hub
    }

    async fn seen(&self, actor: &Actor) {
        self.repo.remember_user(&actor.user_id, &actor.username).await;
    }

    pub async fn create_room(
        &self,
        actor: &Actor,
        name: String,
        description: String,
        slug: String,
    ) -> RoomResult<Room> {
        self.seen(actor).await;
        let room = self
            .repo
            .create(name, description, slug, &actor.user_id)
            .await?;
        tracing::info!("Room {} ({}) created by {}", room.slug, room.id, actor.user_id);
        Ok(room)
    }

    pub async fn list_my_rooms(&self, actor: &Actor) -> RoomResult<Vec<RoomView>> {
        self.seen(actor).await;
        let rooms = self.repo.list_visible_to(&actor.user_id).await?;
        let mut views = Vec::with_capacity(rooms.len());
        for room in rooms {
            views.push(self.repo.hydrate(room).await?);
        }
        Ok(views)
    }

    pub async fn get_room(&self, actor: &Actor, room_id: Uuid) -> RoomResult<RoomView> {
        self.seen(actor).await;
        let room = self.repo.get_by_id(room_id).await?;
        authorize(&room, &actor.user_id, Operation::ReadRoom)?;
        self.repo.hydrate(room).await
    }

    pub async fn join_room(&self, actor: &Actor, slug: &str) -> RoomResult<Room> {
        self.seen(actor).await;
        let room = self.membership.join(slug, &actor.user_id).await?;
        tracing::info!("User {} joined room {}", actor.user_id, room.id);

        self.hub.publish(
            HubEvent::UserJoined {
                room_id: room.id,
                user_id: actor.user_id.clone(),
                username: actor.username.clone(),
            },
            None,
        );
        Ok(room)
    }

    pub async fn leave_room(&self, actor: &Actor, room_id: Uuid) -> RoomResult<()> {
        self.seen(actor).await;
        self.membership.leave(room_id, &actor.user_id).await?;
        tracing::info!("User {} left room {}", actor.user_id, room_id);

        self.hub.publish(
            HubEvent::UserLeft {
                room_id,
                user_id: actor.user_id.clone(),
                username: actor.username.clone(),
            },
            None,
        );
        // A former member may no longer read the room.
        self.hub.detach_user(&actor.user_id, room_id);
        Ok(())
    }

    pub async fn delete_room(&self, actor: &Actor, room_id: Uuid) -> RoomResult<()> {
        self.seen(actor).await;
        let room = self.repo.delete(room_id, &actor.user_id).await?;
        tracing::info!(
            "Room {} deleted by {} with {} note(s)",
            room.id,
            actor.user_id,
            room.notes.len()
        );

        self.hub.publish(HubEvent::RoomDeleted { room_id }, None);
        self.hub.close_topic(room_id);
        Ok(())
    }

    pub async fn create_note(
        &self,
        actor: &Actor,
        room_id: Uuid,
        title: String,
        content: String,
    ) -> RoomResult<Note> {
        self.seen(actor).await;
        let note = self
            .notes
            .create_note(room_id, &actor.user_id, title, content)
            .await?;
        tracing::info!("Note {} created in room {} by {}", note.id, room_id, actor.user_id);

        self.hub.publish(
            HubEvent::NoteCreated {
                room_id,
                note: note.clone(),
            },
            None,
        );
        Ok(note)
    }

    pub async fn update_note(
        &self,
        actor: &Actor,
        room_id: Uuid,
        note_id: Uuid,
        patch: NotePatch,
    ) -> RoomResult<Note> {
        self.seen(actor).await;
        let note = self
            .notes
            .update_note(room_id, note_id, &actor.user_id, patch)
            .await?;
        tracing::info!("Note {} in room {} updated by {}", note_id, room_id, actor.user_id);

        self.hub.publish(
            HubEvent::NoteUpdated {
                room_id,
                note_id,
                note: note.clone(),
            },
            None,
        );
        Ok(note)
    }

    pub async fn delete_note(&self, actor: &Actor, room_id: Uuid, note_id: Uuid) -> RoomResult<()> {
        self.seen(actor).await;
        self.notes
            .delete_note(room_id, note_id, &actor.user_id)
            .await?;
        tracing::info!("Note {} deleted from room {} by {}", note_id, room_id, actor.user_id);

        self.hub
            .publish(HubEvent::NoteDeleted { room_id, note_id }, None);
        Ok(())
    }

    /// Attaches a realtime session to a room the caller is allowed to read.
    ///
    /// A room deleted between the check and the attach has its topic closed,
    /// so the attach fails instead of leaving the session on a dead topic.
    pub async fn attach_session(
        &self,
        actor: &Actor,
        session_id: SessionId,
        room_id: Uuid,
    ) -> RoomResult<()> {
        let room = self.repo.get_by_id(room_id).await?;
        authorize(&room, &actor.user_id, Operation::ReadRoom)?;
        self.hub.attach(session_id, room_id)?;
        Ok(())
    }

    pub async fn online_users(&self, actor: &Actor, room_id: Uuid) -> RoomResult<Vec<UserSummary>> {
        let room = self.repo.get_by_id(room_id).await?;
        authorize(&room, &actor.user_id, Operation::ReadRoom)?;
        Ok(self.hub.online_users(room_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryRoomStore, RoomStore, StaticUserDirectory, StoreError};
    use crate::error::{ErrorKind, RoomError};
    use crate::models::NewRoom;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc::error::TryRecvError;

    /// Memory store whose writes can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryRoomStore,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(StoreError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RoomStore for FlakyStore {
        async fn insert(&self, room: NewRoom) -> Result<Room, StoreError> {
            self.check()?;
            self.inner.insert(room).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<Room>, StoreError> {
            self.inner.find_by_slug(slug).await
        }

        async fn find_for_user(&self, user_id: &str) -> Result<Vec<Room>, StoreError> {
            self.inner.find_for_user(user_id).await
        }

        async fn save(&self, room: &Room) -> Result<bool, StoreError> {
            self.check()?;
            self.inner.save(room).await
        }

        async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
            self.check()?;
            self.inner.remove(id).await
        }
    }

    fn service_with(store: Arc<dyn RoomStore>) -> RoomService {
        let repo = RoomRepository::new(store, Arc::new(StaticUserDirectory::new()));
        RoomService::new(repo, Arc::new(RealtimeHub::new()))
    }

    fn service() -> RoomService {
        service_with(Arc::new(MemoryRoomStore::new()))
    }

    fn u1() -> Actor {
        Actor::new("u1", "alice")
    }

    fn u2() -> Actor {
        Actor::new("u2", "bob")
    }

    #[tokio::test]
    async fn test_end_to_end_room_lifecycle() {
        let service = service();
        let (u1, u2) = (u1(), u2());

        let room = service
            .create_room(&u1, "Team".into(), "notes".into(), "TEAM01".into())
            .await
            .unwrap();
        assert_eq!(room.members, vec!["u1"]);

        let (u1_session, mut u1_rx) = service.hub().subscribe("u1", "alice");
        service
            .attach_session(&u1, u1_session.id, room.id)
            .await
            .unwrap();

        let joined = service.join_room(&u2, "TEAM01").await.unwrap();
        assert_eq!(joined.members, vec!["u1", "u2"]);
        assert_eq!(
            u1_rx.try_recv().unwrap(),
            HubEvent::UserJoined {
                room_id: room.id,
                user_id: "u2".into(),
                username: "bob".into(),
            }
        );

        let note = service
            .create_note(&u2, room.id, "Plan".into(), "v1".into())
            .await
            .unwrap();
        match u1_rx.try_recv().unwrap() {
            HubEvent::NoteCreated { room_id, note: sent } => {
                assert_eq!(room_id, room.id);
                assert_eq!(sent, note);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let patch = NotePatch {
            title: Some(String::new()),
            content: Some("v2".into()),
        };
        let updated = service
            .update_note(&u2, room.id, note.id, patch)
            .await
            .unwrap();
        assert_eq!(updated.title, "Plan");
        assert_eq!(updated.content, "v2");
        assert_eq!(u1_rx.try_recv().unwrap().kind(), "note-updated");

        let view = service.get_room(&u2, room.id).await.unwrap();
        assert_eq!(view.members[1], UserSummary::new("u2", "bob"));
        assert_eq!(view.notes[0].updated_by, UserSummary::new("u2", "bob"));

        service.delete_room(&u1, room.id).await.unwrap();
        assert_eq!(
            u1_rx.try_recv().unwrap(),
            HubEvent::RoomDeleted { room_id: room.id }
        );
        assert!(matches!(
            service.get_room(&u2, room.id).await,
            Err(RoomError::RoomNotFound)
        ));
        assert!(!service.hub().is_attached(u1_session.id, room.id));
    }

    #[tokio::test]
    async fn test_create_room_errors() {
        let service = service();
        service
            .create_room(&u1(), "a".into(), String::new(), "TEAM01".into())
            .await
            .unwrap();

        let err = service
            .create_room(&u2(), "b".into(), String::new(), "TEAM01".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = service
            .create_room(&u2(), "b".into(), String::new(), "no".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_owner_never_leaves_and_outsiders_cannot_read() {
        let service = service();
        let room = service
            .create_room(&u1(), "a".into(), String::new(), "TEAM01".into())
            .await
            .unwrap();
        service
            .create_note(&u1(), room.id, "t".into(), "c".into())
            .await
            .unwrap();

        let err = service.leave_room(&u1(), room.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = service.get_room(&u2(), room.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = service.delete_room(&u2(), room.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(service.get_room(&u1(), room.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_member_can_update_but_not_delete_note() {
        let service = service();
        let room = service
            .create_room(&u1(), "a".into(), String::new(), "TEAM01".into())
            .await
            .unwrap();
        service.join_room(&u2(), "TEAM01").await.unwrap();
        let note = service
            .create_note(&u1(), room.id, "t".into(), "c".into())
            .await
            .unwrap();

        assert!(service
            .update_note(&u2(), room.id, note.id, NotePatch::default())
            .await
            .is_ok());
        let err = service
            .delete_note(&u2(), room.id, note.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        service.delete_note(&u1(), room.id, note.id).await.unwrap();
        assert!(service
            .get_room(&u1(), room.id)
            .await
            .unwrap()
            .notes
            .is_empty());
    }

    #[tokio::test]
    async fn test_nothing_published_when_persistence_fails() {
        let store = Arc::new(FlakyStore::default());
        let service = service_with(store.clone());
        let room = service
            .create_room(&u1(), "a".into(), String::new(), "TEAM01".into())
            .await
            .unwrap();
        let (session, mut rx) = service.hub().subscribe("u1", "alice");
        service
            .attach_session(&u1(), session.id, room.id)
            .await
            .unwrap();

        let published = service.hub().stats().published;
        store.fail_writes.store(true, Ordering::SeqCst);
        let err = service.join_room(&u2(), "TEAM01").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        let err = service
            .create_note(&u1(), room.id, "t".into(), "c".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(service.delete_room(&u1(), room.id).await.is_err());

        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(service.hub().stats().published, published);

        store.fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(
            service.get_room(&u1(), room.id).await.unwrap().members.len(),
            1
        );
    }

    #[tokio::test]
    async fn test_disconnected_session_keeps_its_writes() {
        let service = service();
        let room = service
            .create_room(&u1(), "a".into(), String::new(), "TEAM01".into())
            .await
            .unwrap();
        service.join_room(&u2(), "TEAM01").await.unwrap();

        let (u1_session, mut u1_rx) = service.hub().subscribe("u1", "alice");
        let (u2_session, mut u2_rx) = service.hub().subscribe("u2", "bob");
        service
            .attach_session(&u1(), u1_session.id, room.id)
            .await
            .unwrap();
        service
            .attach_session(&u2(), u2_session.id, room.id)
            .await
            .unwrap();
        assert_eq!(u1_rx.try_recv().unwrap().kind(), "user-joined");

        let note = service
            .create_note(&u2(), room.id, "t".into(), "c".into())
            .await
            .unwrap();
        assert!(u2_rx.try_recv().is_ok());
        assert!(u1_rx.try_recv().is_ok());

        service.hub().disconnect(u2_session.id);
        assert_eq!(u1_rx.try_recv().unwrap().kind(), "user-left");

        service
            .update_note(&u1(), room.id, note.id, NotePatch::default())
            .await
            .unwrap();
        assert!(u1_rx.try_recv().is_ok());
        assert_eq!(u2_rx.try_recv(), Err(TryRecvError::Disconnected));

        let view = service.get_room(&u1(), room.id).await.unwrap();
        assert_eq!(view.notes.len(), 1);
        assert_eq!(view.notes[0].id, note.id);
    }

    #[tokio::test]
    async fn test_attach_requires_read_access() {
        let service = service();
        let room = service
            .create_room(&u1(), "a".into(), String::new(), "TEAM01".into())
            .await
            .unwrap();
        let (session, _rx) = service.hub().subscribe("u2", "bob");

        let err = service
            .attach_session(&u2(), session.id, room.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(service.online_users(&u2(), room.id).await.is_err());

        service.join_room(&u2(), "TEAM01").await.unwrap();
        service
            .attach_session(&u2(), session.id, room.id)
            .await
            .unwrap();
        assert_eq!(
            service.online_users(&u1(), room.id).await.unwrap(),
            vec![UserSummary::new("u2", "bob")]
        );
    }

    #[tokio::test]
    async fn test_leaving_member_stops_receiving_room_events() {
        let service = service();
        let room = service
            .create_room(&u1(), "a".into(), String::new(), "TEAM01".into())
            .await
            .unwrap();
        service.join_room(&u2(), "TEAM01").await.unwrap();

        let (u1_session, mut u1_rx) = service.hub().subscribe("u1", "alice");
        let (u2_session, mut u2_rx) = service.hub().subscribe("u2", "bob");
        service
            .attach_session(&u1(), u1_session.id, room.id)
            .await
            .unwrap();
        service
            .attach_session(&u2(), u2_session.id, room.id)
            .await
            .unwrap();
        assert_eq!(u1_rx.try_recv().unwrap().kind(), "user-joined");

        service.leave_room(&u2(), room.id).await.unwrap();
        assert_eq!(u1_rx.try_recv().unwrap().kind(), "user-left");
        assert_eq!(u2_rx.try_recv().unwrap().kind(), "user-left");
        assert!(!service.hub().is_attached(u2_session.id, room.id));

        service
            .create_note(&u1(), room.id, "secret".into(), "payroll".into())
            .await
            .unwrap();
        assert_eq!(u1_rx.try_recv().unwrap().kind(), "note-created");
        assert_eq!(u2_rx.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(
            service.get_room(&u2(), room.id).await.unwrap_err().kind(),
            ErrorKind::Forbidden
        );
    }

    #[tokio::test]
    async fn test_list_my_rooms() {
        let service = service();
        service
            .create_room(&u1(), "a".into(), String::new(), "ALPHA1".into())
            .await
            .unwrap();
        service
            .create_room(&u2(), "b".into(), String::new(), "BRAVO1".into())
            .await
            .unwrap();
        service.join_room(&u1(), "BRAVO1").await.unwrap();

        let rooms = service.list_my_rooms(&u1()).await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(service.list_my_rooms(&u2()).await.unwrap().len(), 1);
        assert!(service
            .list_my_rooms(&Actor::new("u3", "carol"))
            .await
            .unwrap()
            .is_empty());
    }
}
