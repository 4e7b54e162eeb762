//! A project room: the sessions that receive each other's events.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use super::session::{Member, Occupant};
use crate::domain::{CollabEvent, ProjectId, SessionId};

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Delivery {
    /// Sessions the event was queued for.
    pub(crate) delivered: usize,
    /// Sessions whose queue was full or closed.
    pub(crate) evicted: Vec<SessionId>,
}

#[derive(Debug)]
pub(crate) struct Room {
    project_id: ProjectId,
    members: HashMap<SessionId, Member>,
}

impl Room {
    pub(crate) fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            members: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, member: Member) {
        self.members.insert(member.info.id(), member);
    }

    pub(crate) fn remove(&mut self, session_id: SessionId) -> Option<Member> {
        self.members.remove(&session_id)
    }

    pub(crate) fn contains(&self, session_id: SessionId) -> bool {
        self.members.contains_key(&session_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn drain(&mut self) -> Vec<Member> {
        self.members.drain().map(|(_, member)| member).collect()
    }

    /// Occupants sorted by user id, then join order.
    pub(crate) fn occupants(&self) -> Vec<Occupant> {
        let mut infos: Vec<_> = self.members.values().map(|m| &m.info).collect();
        infos.sort_by_key(|info| (info.identity().user_id, info.join_seq()));
        infos.into_iter().map(|info| info.occupant()).collect()
    }

    /// Queues `event` for every member except `exclude`, without waiting.
    pub(crate) fn broadcast(&self, event: &Arc<CollabEvent>, exclude: Option<SessionId>) -> Delivery {
        debug_assert_eq!(event.project_id, self.project_id);
        let mut delivery = Delivery::default();
        for (session_id, member) in &self.members {
            if Some(*session_id) == exclude {
                continue;
            }
            match member.outbound.try_send(Arc::clone(event)) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_) | TrySendError::Closed(_)) => {
                    delivery.evicted.push(*session_id);
                }
            }
        }
        delivery
    }
}
