use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::event::HubEvent;

pub type SessionId = Uuid;

/// Receives events for one connected session.
///
/// Delivery is a plain synchronous call made while the hub fans out. A
/// `false` return means the session's transport is gone; the hub does not
/// retry.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &HubEvent) -> bool;
}

impl EventSink for mpsc::UnboundedSender<HubEvent> {
    fn deliver(&self, event: &HubEvent) -> bool {
        self.send(event.clone()).is_ok()
    }
}

/// Identity presented by a connecting session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub user_id: String,
    pub username: String,
}

pub(crate) struct SessionEntry {
    pub info: SessionInfo,
    pub sink: Arc<dyn EventSink>,
    pub topics: HashSet<Uuid>,
}
