//! Standing adjustment command handlers.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use ujb_db::queries::adjustments;
use ujb_ledger::adjustment;
use ujb_types::events::EventType;
use ujb_types::Amount;

use super::{now, parse};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

#[derive(Debug, Deserialize)]
struct RegisterParams {
    recipient_key: String,
    amount: Amount,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct RecipientParams {
    recipient_key: String,
}

/// Add a debt owed by a member, netted from their next payouts.
pub async fn register_adjustment(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: RegisterParams = parse(params)?;
    if params.recipient_key.trim().is_empty() {
        return Err(RpcError::invalid_params("recipient_key required"));
    }

    let balance = {
        let mut db = state.db.lock().await;
        adjustment::register(&mut db, &params.recipient_key, params.amount, &params.reason, now())?
    };

    state.event_bus.publish(
        EventType::AdjustmentRegistered,
        serde_json::json!({
            "recipient_key": params.recipient_key,
            "amount": params.amount,
            "outstanding": balance,
        }),
    );
    Ok(serde_json::json!({
        "recipient_key": params.recipient_key,
        "outstanding": balance,
    }))
}

/// Outstanding balance and audit trail for a member.
pub async fn get_adjustment(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: RecipientParams = parse(params)?;
    let db = state.db.lock().await;
    let outstanding = adjustment::outstanding(&db, &params.recipient_key)?;
    let history: Vec<Value> = adjustments::history(&db, &params.recipient_key)?
        .into_iter()
        .map(|row| {
            serde_json::json!({
                "delta": row.delta,
                "reason": row.reason,
                "payout_id": row.payout_id,
                "created_at": row.created_at,
            })
        })
        .collect();

    Ok(serde_json::json!({
        "recipient_key": params.recipient_key,
        "outstanding": outstanding,
        "history": history,
    }))
}
