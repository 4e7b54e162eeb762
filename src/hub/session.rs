//! Per-connection membership state.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{CollabEvent, ProjectId, SessionId, UserIdentity, UserStatus};

/// What a connection presents to the hub when it attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInit {
    /// Room to join.
    pub project_id: ProjectId,
    /// Identity recorded at handshake time.
    pub identity: UserIdentity,
}

#[derive(Debug, Clone, Copy)]
struct Presence {
    status: UserStatus,
    last_seen: DateTime<Utc>,
}

/// Identity and presence of one attached session.
///
/// Shared between the hub loop and the connection tasks. Identity is
/// immutable; presence sits behind a short critical section.
#[derive(Debug)]
pub struct SessionInfo {
    id: SessionId,
    project_id: ProjectId,
    identity: UserIdentity,
    join_seq: u64,
    presence: Mutex<Presence>,
    closed: CancellationToken,
}

impl SessionInfo {
    pub(crate) fn new(init: SessionInit, join_seq: u64) -> Self {
        Self {
            id: SessionId::new(),
            project_id: init.project_id,
            identity: init.identity,
            join_seq,
            presence: Mutex::new(Presence {
                status: UserStatus::Online,
                last_seen: Utc::now(),
            }),
            closed: CancellationToken::new(),
        }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Room the session belongs to.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Identity stamped on every event this session originates.
    #[must_use]
    pub const fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Hub-wide attach order.
    #[must_use]
    pub const fn join_seq(&self) -> u64 {
        self.join_seq
    }

    /// Cached presence status.
    #[must_use]
    pub fn status(&self) -> UserStatus {
        self.presence().status
    }

    /// Time the session was last heard from.
    #[must_use]
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.presence().last_seen
    }

    /// Marks the session as heard from now.
    pub fn touch(&self) {
        self.lock().last_seen = Utc::now();
    }

    /// Updates the cached presence status.
    pub fn set_status(&self, status: UserStatus) {
        let mut presence = self.lock();
        presence.status = status;
        presence.last_seen = Utc::now();
    }

    /// Snapshot for the occupants view.
    #[must_use]
    pub fn occupant(&self) -> Occupant {
        let presence = self.presence();
        Occupant {
            user_id: self.identity.user_id,
            username: self.identity.username.clone(),
            avatar: self.identity.avatar.clone(),
            status: presence.status,
            last_seen: presence.last_seen,
        }
    }

    /// Cancelled once the hub no longer holds the session: detached,
    /// evicted or the hub stopped. Events still queued are stale by then.
    #[must_use]
    pub const fn closed(&self) -> &CancellationToken {
        &self.closed
    }

    /// Returns `true` once the session has left its room.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn presence(&self) -> Presence {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Presence> {
        self.presence.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One entry of a room occupants snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occupant {
    /// Platform user id.
    pub user_id: i64,
    /// Display name.
    pub username: String,
    /// Avatar URL.
    pub avatar: String,
    /// Presence status.
    pub status: UserStatus,
    /// Time the session was last heard from.
    pub last_seen: DateTime<Utc>,
}

/// The hub's side of a session: its identity and the producing half of
/// its outbound queue. Dropping it closes the queue and the session.
#[derive(Debug)]
pub(crate) struct Member {
    pub(crate) info: Arc<SessionInfo>,
    pub(crate) outbound: mpsc::Sender<Arc<CollabEvent>>,
}

impl Drop for Member {
    fn drop(&mut self) {
        self.info.closed.cancel();
    }
}

/// Returned by [`super::HubHandle::attach`]: the session handle and the
/// consuming half of its outbound queue, owned by the connection writer.
#[derive(Debug)]
pub struct AttachedSession {
    /// Shared session state.
    pub info: Arc<SessionInfo>,
    /// Events addressed to this session, in hub order.
    pub outbound: mpsc::Receiver<Arc<CollabEvent>>,
}
