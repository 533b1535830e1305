//! Diagnostics command handlers.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::now;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Daemon health and configuration summary.
pub async fn get_daemon_status(state: &Arc<DaemonState>) -> Result {
    let schema_version: u32 = {
        let db = state.db.lock().await;
        db.query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?
    };

    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "schema_version": schema_version,
        "uptime_secs": now().saturating_sub(state.started_at),
        "event_sequence": state.event_bus.sequence(),
        "platform_label": state.config.ledger.platform_label,
    }))
}

/// Ask the daemon to stop after this response.
pub async fn shutdown(state: &Arc<DaemonState>) -> Result {
    info!("Shutdown requested over RPC");
    // No receivers just means the daemon is already stopping
    let _ = state.shutdown_tx.send(());
    Ok(serde_json::json!({"shutting_down": true}))
}
