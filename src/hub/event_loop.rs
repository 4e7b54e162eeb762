//! The hub's single event loop.
//!
//! Every membership change and every fan-out is handled here, one message
//! at a time, so that all recipients observe events in the order the loop
//! handled them.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::command::{Broadcast, Register, Unregister};
use super::directory::RoomDirectory;
use super::session::{AttachedSession, Member, SessionInfo};
use crate::domain::{CollabEvent, EventType, ProjectId, SessionId, UserIdentity, UserStatus};
use crate::error::HubError;

pub(crate) struct EventLoop {
    pub(crate) directory: Arc<RoomDirectory>,
    pub(crate) register_rx: mpsc::Receiver<Register>,
    pub(crate) unregister_rx: mpsc::Receiver<Unregister>,
    pub(crate) broadcast_rx: mpsc::Receiver<Broadcast>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) outbound_queue: usize,
    pub(crate) next_seq: u64,
}

/// One message taken off any of the three channels.
enum Command {
    Register(Register),
    Unregister(Unregister),
    Broadcast(Broadcast),
}

impl EventLoop {
    pub(crate) async fn run(mut self) {
        tracing::info!("collaboration hub started");
        let shutdown = self.shutdown.clone();
        loop {
            let command = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                command = self.next_command() => command,
            };
            match command {
                Some(Command::Register(register)) => self.on_register(register).await,
                Some(Command::Unregister(unregister)) => self.on_unregister(unregister).await,
                Some(Command::Broadcast(broadcast)) => self.on_broadcast(broadcast).await,
                // Every handle is gone.
                None => break,
            }
        }

        let members = self.directory.clear().await;
        tracing::info!(sessions = members.len(), "collaboration hub stopped");
    }

    /// Waits for the next message. Ready channels are polled in random
    /// order so a busy broadcast channel cannot starve membership changes.
    async fn next_command(&mut self) -> Option<Command> {
        tokio::select! {
            register = self.register_rx.recv() => register.map(Command::Register),
            Some(unregister) = self.unregister_rx.recv() => Some(Command::Unregister(unregister)),
            Some(broadcast) = self.broadcast_rx.recv() => Some(Command::Broadcast(broadcast)),
        }
    }

    async fn on_register(&mut self, register: Register) {
        let Register { init, reply } = register;
        let (outbound, receiver) = mpsc::channel(self.outbound_queue);
        let info = Arc::new(SessionInfo::new(init, self.next_seq));
        self.next_seq += 1;

        let project_id = info.project_id();
        let join = CollabEvent::user_join(project_id, info.identity());
        self.directory
            .insert(Member {
                info: Arc::clone(&info),
                outbound,
            })
            .await;

        let attached = AttachedSession {
            info: Arc::clone(&info),
            outbound: receiver,
        };
        if reply.send(attached).is_err() {
            // Caller went away before the ack; undo silently.
            self.directory.remove(project_id, info.id()).await;
            return;
        }

        tracing::info!(
            session_id = %info.id(),
            %project_id,
            user_id = info.identity().user_id,
            "session attached"
        );
        self.deliver(join, Some(info.id())).await;
    }

    async fn on_unregister(&mut self, unregister: Unregister) {
        let Unregister {
            project_id,
            session_id,
            reply,
        } = unregister;
        // Already evicted or never attached: nothing to announce.
        if let Some(member) = self.directory.remove(project_id, session_id).await {
            tracing::info!(%session_id, %project_id, "session detached");
            self.deliver(CollabEvent::user_leave(project_id, member.info.identity()), None)
                .await;
        }
        let _ = reply.send(());
    }

    async fn on_broadcast(&mut self, broadcast: Broadcast) {
        match broadcast {
            Broadcast::Submit {
                session,
                event_type,
                data,
            } => self.on_submit(&session, event_type, data).await,
            Broadcast::System {
                project_id,
                event_type,
                data,
                reply,
            } => {
                let result = self.on_system(project_id, event_type, data).await;
                let _ = reply.send(result);
            }
        }
    }

    async fn on_submit(&mut self, session: &SessionInfo, event_type: EventType, data: serde_json::Value) {
        if !self.directory.contains(session).await {
            return;
        }
        session.touch();
        match event_type {
            EventType::Heartbeat => return,
            EventType::UserJoin | EventType::UserLeave => {
                tracing::debug!(session_id = %session.id(), %event_type, "client membership event dropped");
                return;
            }
            EventType::UserStatus => {
                let status = data
                    .get("status")
                    .and_then(serde_json::Value::as_str)
                    .and_then(|s| s.parse::<UserStatus>().ok());
                let Some(status) = status else {
                    tracing::debug!(session_id = %session.id(), "invalid user_status payload dropped");
                    return;
                };
                session.set_status(status);
            }
            _ => {}
        }

        let event = CollabEvent::new(
            event_type,
            session.project_id(),
            session.identity().clone(),
            data,
        );
        self.deliver(event, Some(session.id())).await;
    }

    async fn on_system(
        &mut self,
        project_id: ProjectId,
        event_type: EventType,
        data: serde_json::Value,
    ) -> Result<usize, HubError> {
        if self.directory.room_size(project_id).await.is_none() {
            return Err(HubError::RoomNotFound(project_id));
        }
        let event = CollabEvent::new(event_type, project_id, UserIdentity::system(), data);
        Ok(self.deliver(event, None).await)
    }

    /// Fans `event` out and evicts every session whose queue overflowed or
    /// closed. Each eviction is announced with `user_leave`, which can
    /// itself evict further sessions. Returns the number of sessions the
    /// original event was queued for.
    async fn deliver(&self, event: CollabEvent, exclude: Option<SessionId>) -> usize {
        let project_id = event.project_id;
        let mut pending = VecDeque::from([(event, exclude)]);
        let mut delivered = None;

        while let Some((event, exclude)) = pending.pop_front() {
            let event = Arc::new(event);
            let Some(outcome) = self.directory.broadcast(&event, exclude).await else {
                delivered.get_or_insert(0);
                continue;
            };
            delivered.get_or_insert(outcome.delivered);

            for session_id in outcome.evicted {
                let Some(member) = self.directory.remove(project_id, session_id).await else {
                    continue;
                };
                tracing::warn!(%session_id, %project_id, "slow consumer evicted");
                pending.push_back((CollabEvent::user_leave(project_id, member.info.identity()), None));
            }
        }
        delivered.unwrap_or_default()
    }
}
