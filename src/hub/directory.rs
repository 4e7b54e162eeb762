//! Concurrent room storage.
//!
//! [`RoomDirectory`] maps project ids to rooms behind a single
//! [`tokio::sync::RwLock`]. Only the hub loop mutates it, taking the write
//! view for one membership change at a time; broadcasts and snapshot
//! readers take the read view.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::room::{Delivery, Room};
use super::session::{Member, Occupant, SessionInfo};
use crate::domain::{CollabEvent, ProjectId, SessionId};

/// Directory of live rooms.
///
/// A room is created by the first attach to its project and removed
/// together with its last member.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: RwLock<HashMap<ProjectId, Room>>,
}

impl RoomDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Number of sessions in a room, or `None` if it does not exist.
    pub async fn room_size(&self, project_id: ProjectId) -> Option<usize> {
        self.rooms.read().await.get(&project_id).map(Room::len)
    }

    /// Returns `true` if the session is a member of its room.
    pub async fn contains(&self, session: &SessionInfo) -> bool {
        self.rooms
            .read()
            .await
            .get(&session.project_id())
            .is_some_and(|room| room.contains(session.id()))
    }

    /// Snapshot of a room's occupants, or `None` if it does not exist.
    pub async fn occupants(&self, project_id: ProjectId) -> Option<Vec<Occupant>> {
        self.rooms.read().await.get(&project_id).map(Room::occupants)
    }

    pub(crate) async fn insert(&self, member: Member) {
        let project_id = member.info.project_id();
        self.rooms
            .write()
            .await
            .entry(project_id)
            .or_insert_with(|| Room::new(project_id))
            .insert(member);
    }

    /// Removes a member; removes the room too if it becomes empty.
    pub(crate) async fn remove(&self, project_id: ProjectId, session_id: SessionId) -> Option<Member> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&project_id)?;
        let member = room.remove(session_id);
        if room.is_empty() {
            rooms.remove(&project_id);
        }
        member
    }

    /// Fans `event` out to its room. `None` if the room does not exist.
    pub(crate) async fn broadcast(
        &self,
        event: &Arc<CollabEvent>,
        exclude: Option<SessionId>,
    ) -> Option<Delivery> {
        self.rooms
            .read()
            .await
            .get(&event.project_id)
            .map(|room| room.broadcast(event, exclude))
    }

    /// Removes every room and returns all members.
    pub(crate) async fn clear(&self) -> Vec<Member> {
        let mut rooms = self.rooms.write().await;
        rooms
            .drain()
            .flat_map(|(_, mut room)| room.drain())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::UserIdentity;
    use crate::hub::session::SessionInit;

    fn member(project: i64, user: i64) -> Member {
        let (outbound, _rx) = mpsc::channel(1);
        Member {
            info: Arc::new(SessionInfo::new(
                SessionInit {
                    project_id: ProjectId::new(project),
                    identity: UserIdentity::new(user, "u", ""),
                },
                0,
            )),
            outbound,
        }
    }

    #[tokio::test]
    async fn room_lives_while_it_has_members() {
        let dir = RoomDirectory::new();
        let a = member(1, 1);
        let b = member(1, 2);
        let (a_id, b_id) = (a.info.id(), b.info.id());
        dir.insert(a).await;
        dir.insert(b).await;
        dir.insert(member(2, 3)).await;
        assert_eq!(dir.room_count().await, 2);
        assert_eq!(dir.room_size(ProjectId::new(1)).await, Some(2));

        assert!(dir.remove(ProjectId::new(1), a_id).await.is_some());
        assert_eq!(dir.room_count().await, 2);
        assert!(dir.remove(ProjectId::new(1), b_id).await.is_some());
        assert_eq!(dir.room_count().await, 1);
        assert!(dir.occupants(ProjectId::new(1)).await.is_none());
        assert!(dir.remove(ProjectId::new(1), b_id).await.is_none());
    }

    #[tokio::test]
    async fn clear_returns_every_member() {
        let dir = RoomDirectory::new();
        dir.insert(member(1, 1)).await;
        dir.insert(member(2, 2)).await;
        assert_eq!(dir.clear().await.len(), 2);
        assert_eq!(dir.room_count().await, 0);
    }
}
