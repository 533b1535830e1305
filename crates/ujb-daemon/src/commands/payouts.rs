//! Payout and ledger read command handlers.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use ujb_ledger::payout::PayoutRequest;
use ujb_ledger::settlement;
use ujb_types::events::EventType;
use ujb_types::ledger::Slot;
use ujb_types::Amount;

use super::{now, parse, to_result};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Payout request as sent by the settlement screen.
#[derive(Debug, Deserialize)]
struct RequestPayoutParams {
    referral_id: String,
    recipient: Slot,
    amount: Amount,
    /// Redundant with `amount`; must match when present.
    #[serde(default)]
    logical_amount: Option<Amount>,
    #[serde(default)]
    tds_amount: Amount,
    from_payment_id: String,
    mode_of_payment: String,
    transaction_ref: String,
    payment_date: u64,
    #[serde(default)]
    expected_revision: Option<u64>,
}

impl RequestPayoutParams {
    fn into_request(self) -> std::result::Result<PayoutRequest, RpcError> {
        if let Some(logical) = self.logical_amount {
            if logical != self.amount {
                return Err(RpcError::invalid_params("logical_amount must equal amount"));
            }
        }
        Ok(PayoutRequest {
            referral_id: self.referral_id,
            from_payment_id: self.from_payment_id,
            slot: self.recipient,
            amount: self.amount,
            tds_amount: self.tds_amount,
            mode_of_payment: self.mode_of_payment,
            transaction_ref: self.transaction_ref,
            payment_date: self.payment_date,
            expected_revision: self.expected_revision,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RemainingParams {
    referral_id: String,
    payment_id: String,
    slot: Slot,
}

#[derive(Debug, Deserialize)]
struct ReferralIdParams {
    referral_id: String,
}

#[derive(Debug, Deserialize)]
struct EntriesParams {
    referral_id: String,
    #[serde(default)]
    after_seq: u64,
}

/// Pay one slot out of one payment.
pub async fn request_payout(state: &Arc<DaemonState>, params: &Value) -> Result {
    let request = parse::<RequestPayoutParams>(params)?.into_request()?;

    let receipt = {
        let mut db = state.db.lock().await;
        settlement::request_payout(&mut db, &request, &state.config.ledger.platform_label, now())?
    };

    let payout = &receipt.payout;
    state.event_bus.publish(
        EventType::PayoutRecorded,
        serde_json::json!({
            "referral_id": payout.referral_id,
            "payout_id": payout.payout_id,
            "payment_id": payout.belongs_to_payment_id,
            "slot": payout.slot,
            "logical_amount": payout.logical_amount,
            "cash_amount": payout.cash_amount(),
            "seq": receipt.seq,
            "revision": receipt.revision,
        }),
    );
    if receipt.adjustment.deducted > 0 {
        state.event_bus.publish(
            EventType::AdjustmentConsumed,
            serde_json::json!({
                "referral_id": payout.referral_id,
                "payout_id": payout.payout_id,
                "recipient_key": payout.recipient.key,
                "deducted": receipt.adjustment.deducted,
                "remaining_balance": receipt.adjustment.remaining_balance,
            }),
        );
    }
    to_result(&receipt)
}

/// What a slot can still draw from one payment.
pub async fn get_remaining(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: RemainingParams = parse(params)?;
    let db = state.db.lock().await;
    let remaining = settlement::remaining_for(&db, &params.referral_id, &params.payment_id, params.slot)?;
    Ok(serde_json::json!({
        "referral_id": params.referral_id,
        "payment_id": params.payment_id,
        "slot": params.slot,
        "remaining": remaining,
    }))
}

/// Counters plus the full per-slot, per-payment fold.
pub async fn get_ledger_summary(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: ReferralIdParams = parse(params)?;
    let db = state.db.lock().await;
    let summary = settlement::summary(&db, &params.referral_id)?;
    to_result(&summary)
}

/// Ordered log entries, optionally only those after `after_seq`.
pub async fn get_ledger_entries(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: EntriesParams = parse(params)?;
    let db = state.db.lock().await;
    let entries = settlement::entries_after(&db, &params.referral_id, params.after_seq)?;
    to_result(&entries)
}
