//! Inbound payment command handlers.

use std::sync::Arc;

use serde_json::Value;
use ujb_ledger::ingest::PaymentRequest;
use ujb_ledger::settlement;
use ujb_types::events::EventType;

use super::{now, parse, to_result};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Record a manually confirmed payment from the Cosmo.
pub async fn record_payment(state: &Arc<DaemonState>, params: &Value) -> Result {
    let request: PaymentRequest = parse(params)?;

    let receipt = {
        let mut db = state.db.lock().await;
        settlement::record_payment(&mut db, &request, now())?
    };

    state.event_bus.publish(
        EventType::PaymentRecorded,
        serde_json::json!({
            "referral_id": receipt.payment.referral_id,
            "payment_id": receipt.payment.payment_id,
            "amount_received": receipt.payment.amount_received,
            "commission": receipt.payment.commission,
            "seq": receipt.seq,
            "revision": receipt.revision,
        }),
    );
    to_result(&receipt)
}
