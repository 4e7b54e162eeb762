//! Cloneable front end to the hub event loop.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::HubConfig;
use super::command::{Broadcast, Register, Unregister};
use super::directory::RoomDirectory;
use super::event_loop::EventLoop;
use super::session::{AttachedSession, Occupant, SessionInfo, SessionInit};
use crate::domain::{EventType, ProjectId};
use crate::error::HubError;

/// Entry point for starting the collaboration hub.
#[derive(Debug, Clone, Copy)]
pub struct Hub;

impl Hub {
    /// Starts the hub loop on the current tokio runtime.
    #[must_use]
    pub fn spawn(config: HubConfig) -> HubHandle {
        let capacity = config.channel_capacity.max(1);
        let (register_tx, register_rx) = mpsc::channel(capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(capacity);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(capacity);
        let directory = Arc::new(RoomDirectory::new());
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        tracker.spawn(
            EventLoop {
                directory: Arc::clone(&directory),
                register_rx,
                unregister_rx,
                broadcast_rx,
                shutdown: shutdown.clone(),
                outbound_queue: config.outbound_queue.max(1),
                next_seq: 0,
            }
            .run(),
        );
        tracker.close();

        HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            directory,
            shutdown,
            tracker,
        }
    }
}

/// Handle to a running hub. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<Register>,
    unregister_tx: mpsc::Sender<Unregister>,
    broadcast_tx: mpsc::Sender<Broadcast>,
    directory: Arc<RoomDirectory>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl HubHandle {
    /// Joins a room and announces the session to the other members.
    ///
    /// Returns once the session is a member, so anything it submits
    /// afterwards is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the hub is not running.
    pub async fn attach(&self, init: SessionInit) -> Result<AttachedSession, HubError> {
        let (reply, ack) = oneshot::channel();
        self.register_tx
            .send(Register { init, reply })
            .await
            .map_err(|_| HubError::Stopped)?;
        ack.await.map_err(|_| HubError::Stopped)
    }

    /// Leaves the room and announces it. Detaching a session that is no
    /// longer a member (for example after eviction) does nothing.
    ///
    /// Returns once the hub has handled the request, so a later attach by
    /// the same caller is announced after the `user_leave`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the hub is not running.
    pub async fn detach(&self, session: &SessionInfo) -> Result<(), HubError> {
        let (reply, ack) = oneshot::channel();
        self.unregister_tx
            .send(Unregister {
                project_id: session.project_id(),
                session_id: session.id(),
                reply,
            })
            .await
            .map_err(|_| HubError::Stopped)?;
        ack.await.map_err(|_| HubError::Stopped)
    }

    /// Submits a frame from `session` for delivery to the rest of its room.
    ///
    /// Origin fields and timestamp are set by the hub. `heartbeat` only
    /// refreshes the session's last-seen time.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] if the hub is not running.
    pub async fn submit(
        &self,
        session: &Arc<SessionInfo>,
        event_type: EventType,
        data: serde_json::Value,
    ) -> Result<(), HubError> {
        self.broadcast_tx
            .send(Broadcast::Submit {
                session: Arc::clone(session),
                event_type,
                data,
            })
            .await
            .map_err(|_| HubError::Stopped)
    }

    /// Injects an event with the system identity into every session of a
    /// room and returns how many sessions it was queued for.
    ///
    /// # Errors
    ///
    /// - [`HubError::InvalidEvent`] for `heartbeat`, `user_join` and
    ///   `user_leave`.
    /// - [`HubError::RoomNotFound`] if the room does not exist.
    /// - [`HubError::Stopped`] if the hub is not running.
    pub async fn post_system_event(
        &self,
        project_id: ProjectId,
        event_type: EventType,
        data: serde_json::Value,
    ) -> Result<usize, HubError> {
        if event_type == EventType::Heartbeat || event_type.is_membership() {
            return Err(HubError::InvalidEvent(format!(
                "`{event_type}` cannot be posted as a system event"
            )));
        }
        let (reply, result) = oneshot::channel();
        self.broadcast_tx
            .send(Broadcast::System {
                project_id,
                event_type,
                data,
                reply,
            })
            .await
            .map_err(|_| HubError::Stopped)?;
        result.await.map_err(|_| HubError::Stopped)?
    }

    /// Snapshot of a room's occupants, sorted by user id then join order.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::RoomNotFound`] if the room does not exist.
    pub async fn room_occupants(&self, project_id: ProjectId) -> Result<Vec<Occupant>, HubError> {
        self.directory
            .occupants(project_id)
            .await
            .ok_or(HubError::RoomNotFound(project_id))
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.directory.room_count().await
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops the loop, discarding pending broadcasts and closing every
    /// session queue, and waits for it to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;

    use super::*;
    use crate::domain::{CollabEvent, UserIdentity, UserStatus};

    const WAIT: Duration = Duration::from_secs(2);

    async fn attach(hub: &HubHandle, project: i64, user: i64, name: &str) -> AttachedSession {
        let init = SessionInit {
            project_id: ProjectId::new(project),
            identity: UserIdentity::new(user, name, ""),
        };
        let Ok(session) = hub.attach(init).await else {
            panic!("attach failed");
        };
        session
    }

    async fn next(session: &mut AttachedSession) -> Arc<CollabEvent> {
        let Ok(Some(event)) = timeout(WAIT, session.outbound.recv()).await else {
            panic!("expected an event");
        };
        event
    }

    async fn nothing(session: &mut AttachedSession) {
        let result = timeout(Duration::from_millis(100), session.outbound.recv()).await;
        assert!(result.is_err(), "unexpected event: {result:?}");
    }

    /// Round-trips through the loop so that earlier commands are handled.
    async fn settle(hub: &HubHandle) {
        let _ = hub
            .post_system_event(ProjectId::new(i64::MAX), EventType::ProjectUpdate, json!({}))
            .await;
    }

    #[tokio::test]
    async fn join_and_leave_are_announced() {
        let hub = Hub::spawn(HubConfig::default());
        let mut a = attach(&hub, 1, 1, "ada").await;
        let mut b = attach(&hub, 1, 2, "bob").await;
        nothing(&mut b).await;

        let join = next(&mut a).await;
        assert_eq!(join.event_type, EventType::UserJoin);
        assert_eq!(join.origin.user_id, 2);

        assert!(hub.detach(&a.info).await.is_ok());
        let leave = next(&mut b).await;
        assert_eq!(leave.event_type, EventType::UserLeave);
        assert_eq!(leave.origin.user_id, 1);
        assert_eq!(leave.origin.username, "ada");
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn submit_fans_out_with_recorded_origin() {
        let hub = Hub::spawn(HubConfig::default());
        let mut a = attach(&hub, 1, 1, "ada").await;
        let mut b = attach(&hub, 1, 2, "bob").await;
        let mut c = attach(&hub, 1, 3, "cy").await;
        let mut d = attach(&hub, 2, 4, "dee").await;
        // Drain join announcements.
        next(&mut a).await;
        next(&mut a).await;
        next(&mut b).await;

        let payload = json!({"message": "hi", "message_id": "m1"});
        assert!(hub.submit(&a.info, EventType::ChatMessage, payload.clone()).await.is_ok());

        for session in [&mut b, &mut c] {
            let event = next(session).await;
            assert_eq!(event.event_type, EventType::ChatMessage);
            assert_eq!(event.origin.user_id, 1);
            assert_eq!(event.origin.username, "ada");
            assert_eq!(event.project_id, ProjectId::new(1));
            assert_eq!(event.data, payload);
        }
        nothing(&mut a).await;
        nothing(&mut d).await;
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn events_from_one_sender_arrive_in_submit_order() {
        let hub = Hub::spawn(HubConfig::default());
        let a = attach(&hub, 1, 1, "ada").await;
        let mut b = attach(&hub, 1, 2, "bob").await;
        let mut c = attach(&hub, 1, 3, "cy").await;
        next(&mut b).await;

        for i in 0..50 {
            assert!(hub.submit(&a.info, EventType::ChatMessage, json!({"n": i})).await.is_ok());
        }
        for session in [&mut b, &mut c] {
            for i in 0..50 {
                let event = next(session).await;
                assert_eq!(event.data["n"], i);
            }
        }
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn reattach_after_detach_is_announced_after_the_leave() {
        let hub = Hub::spawn(HubConfig {
            outbound_queue: 4096,
            ..HubConfig::default()
        });
        let mut watcher = attach(&hub, 1, 3, "cy").await;
        let a = attach(&hub, 1, 1, "ada").await;
        let typist = attach(&hub, 1, 2, "bob").await;
        next(&mut watcher).await;
        next(&mut watcher).await;

        // Leaves a backlog in the broadcast channel.
        for i in 0..2000 {
            assert!(hub.submit(&typist.info, EventType::Typing, json!({"n": i})).await.is_ok());
        }
        assert!(hub.detach(&a.info).await.is_ok());
        let _again = attach(&hub, 1, 1, "ada").await;

        let mut membership = Vec::new();
        while membership.len() < 2 {
            let event = next(&mut watcher).await;
            if event.event_type.is_membership() && event.origin.user_id == 1 {
                membership.push(event.event_type);
            }
        }
        assert_eq!(membership, vec![EventType::UserLeave, EventType::UserJoin]);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn heartbeat_is_absorbed() {
        let hub = Hub::spawn(HubConfig::default());
        let a = attach(&hub, 1, 1, "ada").await;
        let mut b = attach(&hub, 1, 2, "bob").await;
        let before = a.info.last_seen();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(hub.submit(&a.info, EventType::Heartbeat, json!({})).await.is_ok());
        settle(&hub).await;
        nothing(&mut b).await;
        assert!(a.info.last_seen() > before);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn user_status_updates_presence() {
        let hub = Hub::spawn(HubConfig::default());
        let a = attach(&hub, 1, 1, "ada").await;
        let mut b = attach(&hub, 1, 2, "bob").await;

        assert!(hub.submit(&a.info, EventType::UserStatus, json!({"status": "sleepy"})).await.is_ok());
        assert!(hub.submit(&a.info, EventType::UserStatus, json!({"status": "away"})).await.is_ok());
        let event = next(&mut b).await;
        assert_eq!(event.data["status"], "away");
        assert_eq!(a.info.status(), UserStatus::Away);

        let Ok(occupants) = hub.room_occupants(ProjectId::new(1)).await else {
            panic!("room should exist");
        };
        assert_eq!(occupants.len(), 2);
        assert_eq!(occupants.first().map(|o| o.status), Some(UserStatus::Away));
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn system_events_reach_everyone() {
        let hub = Hub::spawn(HubConfig::default());
        let mut a = attach(&hub, 1, 1, "ada").await;
        let mut b = attach(&hub, 1, 2, "bob").await;
        next(&mut a).await;

        let delivered = hub
            .post_system_event(ProjectId::new(1), EventType::ProjectUpdate, json!({"message": "renamed"}))
            .await;
        assert_eq!(delivered, Ok(2));
        for session in [&mut a, &mut b] {
            let event = next(session).await;
            assert!(event.origin.is_system());
        }

        let missing = hub
            .post_system_event(ProjectId::new(9), EventType::ProjectUpdate, json!({}))
            .await;
        assert_eq!(missing, Err(HubError::RoomNotFound(ProjectId::new(9))));
        let heartbeat = hub
            .post_system_event(ProjectId::new(1), EventType::Heartbeat, json!({}))
            .await;
        assert!(matches!(heartbeat, Err(HubError::InvalidEvent(_))));
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn slow_consumer_is_evicted_without_affecting_others() {
        let hub = Hub::spawn(HubConfig {
            outbound_queue: 2,
            ..HubConfig::default()
        });
        let mut sender = attach(&hub, 1, 1, "ada").await;
        let mut slow = attach(&hub, 1, 2, "slow").await;
        let mut fast = attach(&hub, 1, 3, "fast").await;
        next(&mut sender).await;
        next(&mut sender).await;

        // `slow` already holds the join of `fast` and never reads.
        for i in 0..2 {
            assert!(hub.submit(&sender.info, EventType::Typing, json!({"n": i})).await.is_ok());
            let event = next(&mut fast).await;
            assert_eq!(event.data["n"], i);
        }
        // Eviction is announced to the remaining members.
        let leave = next(&mut fast).await;
        assert_eq!(leave.event_type, EventType::UserLeave);
        assert_eq!(leave.origin.user_id, 2);

        let Ok(occupants) = hub.room_occupants(ProjectId::new(1)).await else {
            panic!("room should exist");
        };
        let users: Vec<i64> = occupants.iter().map(|o| o.user_id).collect();
        assert_eq!(users, vec![1, 3]);
        assert!(slow.info.is_closed());
        assert!(!fast.info.is_closed());

        let mut drained = 0;
        while slow.outbound.recv().await.is_some() {
            drained += 1;
        }
        assert_eq!(drained, 2);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn last_detach_removes_room() {
        let hub = Hub::spawn(HubConfig::default());
        let a = attach(&hub, 1, 1, "ada").await;
        assert_eq!(hub.room_count().await, 1);
        assert!(hub.detach(&a.info).await.is_ok());
        assert_eq!(hub.room_count().await, 0);
        assert!(a.info.is_closed());
        assert!(matches!(
            hub.room_occupants(ProjectId::new(1)).await,
            Err(HubError::RoomNotFound(_))
        ));
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_queues_and_rejects_calls() {
        let hub = Hub::spawn(HubConfig::default());
        let mut a = attach(&hub, 1, 1, "ada").await;
        hub.shutdown().await;
        assert!(hub.is_stopped());
        let Ok(closed) = timeout(WAIT, a.outbound.recv()).await else {
            panic!("queue should close");
        };
        assert!(closed.is_none());
        assert!(a.info.is_closed());

        let init = SessionInit {
            project_id: ProjectId::new(1),
            identity: UserIdentity::new(2, "bob", ""),
        };
        assert!(matches!(hub.attach(init).await, Err(HubError::Stopped)));
        assert_eq!(hub.room_count().await, 0);
    }
}
