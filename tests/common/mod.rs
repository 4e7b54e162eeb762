//! Shared harness: an in-process server on an ephemeral port backed by
//! the in-memory doubles, plus WebSocket client helpers.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use devhub_gateway::adapters::{MemoryGitGateway, MemoryStore};
use devhub_gateway::app_state::{AppState, build_app};
use devhub_gateway::domain::ProjectId;
use devhub_gateway::hub::{Hub, HubConfig, HubHandle};
use devhub_gateway::service::RepositoryService;
use devhub_gateway::txn::{Coordinator, CoordinatorConfig};
use devhub_gateway::ws::ConnectionSettings;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// WebSocket client stream.
pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A running server and handles on its collaborators.
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    /// The server's hub.
    pub hub: HubHandle,
    /// Local store double.
    pub store: MemoryStore,
    /// Git gateway double.
    pub gateway: MemoryGitGateway,
}

impl TestServer {
    /// Starts a server with default hub and keepalive settings.
    pub async fn start() -> Self {
        Self::start_with(HubConfig::default(), ConnectionSettings::default()).await
    }

    /// Starts a server with the given hub and keepalive settings.
    pub async fn start_with(hub_config: HubConfig, ws_settings: ConnectionSettings) -> Self {
        let store = MemoryStore::new();
        let gateway = MemoryGitGateway::new();
        let repositories = Arc::new(RepositoryService::new(
            Coordinator::new(CoordinatorConfig {
                step_timeout: Some(Duration::from_secs(2)),
            }),
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
        ));
        let hub = Hub::spawn(hub_config);
        let app = build_app(AppState {
            hub: hub.clone(),
            repositories,
            service_name: Arc::from("devhub-gateway-test"),
            ws_settings,
        });

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind should succeed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("listener should have an address");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            hub,
            store,
            gateway,
        }
    }

    /// Absolute URL for an HTTP path.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Opens a WebSocket session and waits until the hub lists it.
    pub async fn join(&self, user_id: i64, username: &str, project_id: i64) -> Client {
        let before = self.occupant_count(project_id).await;
        let url = format!(
            "ws://{}/ws?user_id={user_id}&username={username}&project_id={project_id}",
            self.addr
        );
        let Ok((client, _)) = tokio_tungstenite::connect_async(url).await else {
            panic!("handshake should succeed");
        };
        self.wait_for_occupants(project_id, before + 1).await;
        client
    }

    /// Number of sessions currently in a room.
    pub async fn occupant_count(&self, project_id: i64) -> usize {
        self.hub
            .room_occupants(ProjectId::new(project_id))
            .await
            .map(|users| users.len())
            .unwrap_or(0)
    }

    /// Polls until a room holds exactly `count` sessions.
    pub async fn wait_for_occupants(&self, project_id: i64, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(3), async {
            while self.occupant_count(project_id).await != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if waited.is_err() {
            panic!("room {project_id} never reached {count} occupants");
        }
    }
}

/// Sends a JSON text frame.
pub async fn send_json(client: &mut Client, value: &serde_json::Value) {
    if client.send(Message::text(value.to_string())).await.is_err() {
        panic!("send should succeed");
    }
}

/// Next JSON event, skipping control frames. Panics after two seconds.
pub async fn next_event(client: &mut Client) -> serde_json::Value {
    let next = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).ok(),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                _ => return None,
            }
        }
    })
    .await;
    match next {
        Ok(Some(value)) => value,
        Ok(None) => panic!("connection closed while waiting for an event"),
        Err(_) => panic!("no event within two seconds"),
    }
}

/// Asserts that no text frame arrives within `wait`.
pub async fn expect_silence(client: &mut Client, wait: Duration) {
    let next = tokio::time::timeout(wait, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                other => return other,
            }
        }
    })
    .await;
    if let Ok(Some(Ok(frame))) = next {
        panic!("unexpected frame: {frame:?}");
    }
}
