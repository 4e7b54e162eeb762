//! Messages carried by the hub's bounded channels.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::session::{AttachedSession, SessionInfo, SessionInit};
use crate::domain::{EventType, ProjectId, SessionId};
use crate::error::HubError;

/// `register` channel: join a room, acknowledged once membership exists.
#[derive(Debug)]
pub(crate) struct Register {
    pub(crate) init: SessionInit,
    pub(crate) reply: oneshot::Sender<AttachedSession>,
}

/// `unregister` channel: leave a room, acknowledged once `user_leave` has
/// been queued for the remaining members.
#[derive(Debug)]
pub(crate) struct Unregister {
    pub(crate) project_id: ProjectId,
    pub(crate) session_id: SessionId,
    pub(crate) reply: oneshot::Sender<()>,
}

/// `broadcast` channel: everything that fans out to a room.
#[derive(Debug)]
pub(crate) enum Broadcast {
    /// A frame submitted by a session. Origin is taken from `session`.
    Submit {
        session: Arc<SessionInfo>,
        event_type: EventType,
        data: serde_json::Value,
    },
    /// A hub-side injection with the system identity.
    System {
        project_id: ProjectId,
        event_type: EventType,
        data: serde_json::Value,
        reply: oneshot::Sender<Result<usize, HubError>>,
    },
}
