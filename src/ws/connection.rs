//! WebSocket connection state machine.
//!
//! One attached connection runs two tasks: a reader that decodes frames and
//! submits them to the hub, and a writer that drains the session's
//! outbound queue and emits keepalive pings. Either side ending terminates
//! the other, after which the session is detached.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at, timeout};
use tokio_util::sync::CancellationToken;

use super::messages::{decode_inbound, encode_outbound};
use crate::domain::CollabEvent;
use crate::hub::{AttachedSession, HubHandle, SessionInfo, SessionInit};

/// Keepalive and deadline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Period of transport-level pings sent by the writer.
    pub ping_interval: Duration,
    /// Maximum silence from the client before the reader gives up.
    pub read_deadline: Duration,
    /// Maximum time a single frame write may take.
    pub write_deadline: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(54),
            read_deadline: Duration::from_secs(60),
            write_deadline: Duration::from_secs(10),
        }
    }
}

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgraded, not yet a room member.
    Handshaking,
    /// Member of its room; frames flow both ways.
    Attached,
    /// Reader or writer ended; leaving the room.
    Detaching,
    /// Gone.
    Detached,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Handshaking => "handshaking",
            Self::Attached => "attached",
            Self::Detaching => "detaching",
            Self::Detached => "detached",
        };
        f.write_str(s)
    }
}

/// Runs a connection from attach to detach.
pub async fn run_connection(
    mut socket: WebSocket,
    hub: HubHandle,
    init: SessionInit,
    settings: ConnectionSettings,
) {
    let mut state = SessionState::Handshaking;
    tracing::debug!(project_id = %init.project_id, user_id = init.identity.user_id, %state, "ws upgraded");

    let attached = match hub.attach(init).await {
        Ok(attached) => attached,
        Err(err) => {
            tracing::warn!(error = %err, "ws attach refused");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    let AttachedSession { info, outbound } = attached;
    state = SessionState::Attached;
    tracing::debug!(session_id = %info.id(), %state, "ws session state");

    let (sink, stream) = socket.split();
    let stop = CancellationToken::new();
    let writer = tokio::spawn(write_loop(
        sink,
        outbound,
        settings,
        stop.clone(),
        info.closed().clone(),
    ));

    read_loop(stream, &hub, &info, settings, &stop).await;

    state = SessionState::Detaching;
    tracing::debug!(session_id = %info.id(), %state, "ws session state");
    stop.cancel();
    if let Err(err) = writer.await {
        tracing::warn!(session_id = %info.id(), error = %err, "ws writer task failed");
    }
    if let Err(err) = hub.detach(&info).await {
        tracing::debug!(session_id = %info.id(), error = %err, "detach after hub stop");
    }

    state = SessionState::Detached;
    tracing::debug!(session_id = %info.id(), %state, "ws connection closed");
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    hub: &HubHandle,
    info: &Arc<SessionInfo>,
    settings: ConnectionSettings,
    stop: &CancellationToken,
) {
    loop {
        let next = tokio::select! {
            () = stop.cancelled() => break,
            next = timeout(settings.read_deadline, stream.next()) => next,
        };
        let message = match next {
            Err(_) => {
                tracing::debug!(session_id = %info.id(), "read deadline exceeded");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(err))) => {
                tracing::debug!(session_id = %info.id(), error = %err, "ws read failed");
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => match decode_inbound(text.as_str()) {
                Ok(frame) => {
                    if hub.submit(info, frame.event_type, frame.data).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::debug!(session_id = %info.id(), error = %err, "inbound frame dropped");
                }
            },
            Message::Pong(_) => info.touch(),
            Message::Close(_) => break,
            Message::Binary(_) | Message::Ping(_) => {}
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Arc<CollabEvent>>,
    settings: ConnectionSettings,
    stop: CancellationToken,
    closed: CancellationToken,
) {
    let mut ping = interval_at(Instant::now() + settings.ping_interval, settings.ping_interval);
    loop {
        let message = tokio::select! {
            biased;
            () = stop.cancelled() => break,
            // Evicted or the hub stopped: the backlog is not flushed.
            () = closed.cancelled() => break,
            _ = ping.tick() => Message::Ping(Bytes::new()),
            event = outbound.recv() => match event {
                Some(event) => match encode_outbound(&event) {
                    Ok(json) => Message::text(json),
                    Err(err) => {
                        tracing::warn!(error = %err, "outbound event not encodable");
                        continue;
                    }
                },
                None => break,
            },
        };

        match timeout(settings.write_deadline, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "ws write failed");
                break;
            }
            Err(_) => {
                tracing::debug!("write deadline exceeded");
                break;
            }
        }
    }

    let _ = timeout(settings.write_deadline, sink.send(Message::Close(None))).await;
    stop.cancel();
}
