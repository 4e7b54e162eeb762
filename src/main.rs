//! devhub-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use devhub_gateway::adapters::{GitGateway, HttpGitGateway, LocalStore, MemoryStore};
use devhub_gateway::app_state::{AppState, build_app};
use devhub_gateway::config::GatewayConfig;
use devhub_gateway::hub::Hub;
use devhub_gateway::persistence::PgStore;
use devhub_gateway::service::RepositoryService;
use devhub_gateway::txn::Coordinator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env().context("invalid LISTEN_ADDR")?;
    tracing::info!(addr = %config.listen_addr, service = %config.service_name, "starting devhub-gateway");

    // Local store
    let store: Arc<dyn LocalStore> = if config.persistence_enabled {
        let store = PgStore::connect(&config)
            .await
            .context("failed to connect to PostgreSQL")?;
        tracing::info!("persistence enabled (PostgreSQL)");
        Arc::new(store)
    } else {
        tracing::warn!("persistence disabled, repositories are kept in memory");
        Arc::new(MemoryStore::new())
    };

    // Git gateway client
    let gateway: Arc<dyn GitGateway> = Arc::new(
        HttpGitGateway::new(&config.git_gateway).context("invalid Git gateway configuration")?,
    );

    // Service layer
    let repositories = Arc::new(RepositoryService::new(
        Coordinator::new(config.coordinator_config()),
        store,
        gateway,
    ));

    // Collaboration hub
    let hub = Hub::spawn(config.hub_config());

    let app_state = AppState {
        hub: hub.clone(),
        repositories,
        service_name: Arc::from(config.service_name.as_str()),
        ws_settings: config.connection_settings(),
    };
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    hub.shutdown().await;
    tracing::info!("devhub-gateway stopped");
    Ok(())
}

/// Initializes tracing. `LOG_FORMAT=json` selects the JSON formatter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
