//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC method calls to the command handlers. A
//! connection that calls `subscribe_events` also receives event
//! notifications interleaved with its responses.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use ujb_db::DbError;
use ujb_ledger::LedgerError;
use ujb_types::events::Event;

use crate::commands;
use crate::events::EventFilter;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Server-initiated event notification.
#[derive(Debug, Serialize)]
pub struct RpcNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: &'a Event,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Stable error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, "METHOD_NOT_FOUND", Some(serde_json::json!({"method": method})))
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(-32602, "INVALID_PARAMS", Some(serde_json::json!({"detail": detail})))
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(-32603, "INTERNAL_ERROR", Some(serde_json::json!({"detail": detail})))
    }
}

impl From<LedgerError> for RpcError {
    fn from(e: LedgerError) -> Self {
        let detail = e.to_string();
        match e {
            LedgerError::Commission(inner) => Self::new(
                -32020,
                "COMMISSION_CONFIG_INVALID",
                Some(serde_json::json!({"detail": inner.to_string()})),
            ),
            LedgerError::MissingCommission(referral_id) => Self::new(
                -32021,
                "COMMISSION_CONFIG_MISSING",
                Some(serde_json::json!({"referral_id": referral_id})),
            ),
            LedgerError::Overpayment { amount, remaining } => Self::new(
                -32030,
                "OVERPAYMENT",
                Some(serde_json::json!({"amount": amount, "remaining": remaining})),
            ),
            LedgerError::OverPayout {
                payment_id,
                slot,
                requested,
                remaining,
            } => Self::new(
                -32031,
                "OVER_PAYOUT",
                Some(serde_json::json!({
                    "payment_id": payment_id,
                    "slot": slot,
                    "requested": requested,
                    "remaining": remaining,
                })),
            ),
            LedgerError::ZeroAmount => Self::new(-32032, "ZERO_AMOUNT", None),
            LedgerError::DealNotWon(referral_id) => Self::new(
                -32040,
                "DEAL_NOT_WON",
                Some(serde_json::json!({"referral_id": referral_id})),
            ),
            LedgerError::AgreedAmountMissing(referral_id) => Self::new(
                -32041,
                "AGREED_AMOUNT_MISSING",
                Some(serde_json::json!({"referral_id": referral_id})),
            ),
            LedgerError::UnknownPayment {
                referral_id,
                payment_id,
            } => Self::new(
                -32042,
                "PAYMENT_NOT_FOUND",
                Some(serde_json::json!({"referral_id": referral_id, "payment_id": payment_id})),
            ),
            LedgerError::NotFound(what) => {
                Self::new(-32043, "NOT_FOUND", Some(serde_json::json!({"detail": what})))
            }
            LedgerError::InvalidTerms(why) => {
                Self::new(-32044, "INVALID_TERMS", Some(serde_json::json!({"detail": why})))
            }
            LedgerError::Conflict {
                referral_id,
                expected,
            } => Self::new(
                -32050,
                "CONFLICT",
                Some(serde_json::json!({"referral_id": referral_id, "expected_revision": expected})),
            ),
            LedgerError::Corrupt(_) | LedgerError::Overflow => {
                error!(%detail, "ledger invariant violated");
                Self::new(-32060, "LEDGER_INVARIANT", Some(serde_json::json!({"detail": detail})))
            }
            LedgerError::Db(_) => Self::internal_error(&detail),
        }
    }
}

impl From<DbError> for RpcError {
    fn from(e: DbError) -> Self {
        LedgerError::from(e).into()
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(socket = ?self.socket_path, "IPC server listening");

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

struct Subscription {
    rx: broadcast::Receiver<Event>,
    filter: EventFilter,
}

enum Incoming {
    Line(Option<String>),
    Event(Result<Event, broadcast::error::RecvError>),
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut subscription: Option<Subscription> = None;

    loop {
        let incoming = match subscription.as_mut() {
            Some(sub) => tokio::select! {
                line = lines.next_line() => Incoming::Line(line?),
                received = sub.rx.recv() => Incoming::Event(received),
            },
            None => Incoming::Line(lines.next_line().await?),
        };

        let line = match incoming {
            Incoming::Line(line) => line,
            Incoming::Event(Ok(event)) => {
                let wanted = subscription.as_ref().is_some_and(|sub| sub.filter.matches(&event));
                if wanted {
                    let notification = RpcNotification {
                        jsonrpc: "2.0",
                        method: "event",
                        params: &event,
                    };
                    write_line(&mut writer, &notification).await?;
                }
                continue;
            }
            Incoming::Event(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                warn!(skipped, "event subscriber lagged");
                continue;
            }
            Incoming::Event(Err(broadcast::error::RecvError::Closed)) => {
                subscription = None;
                continue;
            }
        };

        let Some(line) = line else {
            break; // EOF
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => match request.method.as_str() {
                "subscribe_events" => {
                    let id = request.id.clone();
                    match commands::parse::<SubscribeParams>(&request.params) {
                        Ok(params) => {
                            subscription = Some(Subscription {
                                rx: state.event_bus.subscribe(),
                                filter: params.filter.unwrap_or_default(),
                            });
                            RpcResponse::success(
                                id,
                                serde_json::json!({
                                    "subscribed": true,
                                    "sequence": state.event_bus.sequence(),
                                }),
                            )
                        }
                        Err(e) => RpcResponse::error(id, e),
                    }
                }
                "unsubscribe_events" => {
                    let was_subscribed = subscription.take().is_some();
                    RpcResponse::success(request.id, serde_json::json!({"unsubscribed": was_subscribed}))
                }
                _ => dispatch_request(state.clone(), request).await,
            },
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        write_line(&mut writer, &response).await?;
    }

    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct SubscribeParams {
    #[serde(default)]
    filter: Option<EventFilter>,
}

async fn write_line<T: Serialize>(writer: &mut OwnedWriteHalf, message: &T) -> anyhow::Result<()> {
    let mut json = serde_json::to_string(message)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub(crate) async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Referral terms
        "upsert_referral" => commands::referrals::upsert_referral(&state, &request.params).await,
        "get_referral" => commands::referrals::get_referral(&state, &request.params).await,
        "list_referrals" => commands::referrals::list_referrals(&state, &request.params).await,
        "update_deal_status" => {
            commands::referrals::update_deal_status(&state, &request.params).await
        }
        "set_agreed_amount" => commands::referrals::set_agreed_amount(&state, &request.params).await,

        // Inbound payments
        "record_payment" => commands::payments::record_payment(&state, &request.params).await,

        // Payouts and ledger reads
        "request_payout" => commands::payouts::request_payout(&state, &request.params).await,
        "get_remaining" => commands::payouts::get_remaining(&state, &request.params).await,
        "get_ledger_summary" => commands::payouts::get_ledger_summary(&state, &request.params).await,
        "get_ledger_entries" => commands::payouts::get_ledger_entries(&state, &request.params).await,

        // Adjustments
        "register_adjustment" => {
            commands::adjustments::register_adjustment(&state, &request.params).await
        }
        "get_adjustment" => commands::adjustments::get_adjustment(&state, &request.params).await,

        // Diagnostics
        "get_daemon_status" => commands::diagnostics::get_daemon_status(&state).await,
        "shutdown" => commands::diagnostics::shutdown(&state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
