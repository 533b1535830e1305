//! ujb-daemon: the referral settlement ledger service.
//!
//! Single OS process running a Tokio async runtime. The admin console talks
//! to the daemon via JSON-RPC over a Unix socket; every ledger write is one
//! SQLite transaction against the shared database.

mod commands;
mod config;
mod events;
mod rpc;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};
use ujb_types::events::EventType;

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
    /// Unix time the daemon came up.
    pub started_at: u64,
}

impl DaemonState {
    fn new(conn: rusqlite::Connection, config: DaemonConfig) -> Arc<Self> {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        Arc::new(Self {
            db: Arc::new(tokio::sync::Mutex::new(conn)),
            event_bus: EventBus::new(config.events.buffer),
            config,
            shutdown_tx,
            started_at: commands::now(),
        })
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> anyhow::Result<Arc<Self>> {
        Ok(Self::new(ujb_db::open_memory()?, DaemonConfig::default()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_directive().parse()?),
        )
        .init();

    info!("UJB settlement daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 3. Open database
    let db_path = config.db_path();
    let conn = ujb_db::open_with_timeout(&db_path, config.busy_timeout())?;
    info!(path = ?db_path, "ledger database open");

    // 4. Build daemon state
    let state = DaemonState::new(conn, config);

    // 5. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    // 6. Emit DaemonStarted event
    state.event_bus.publish(
        EventType::DaemonStarted,
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    );

    // 7. Run the RPC server until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("Daemon shutting down gracefully");

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
