//! Transactional settlement operations against the ledger database.
//!
//! Each write runs as one `BEGIN IMMEDIATE` transaction: read the referral
//! and its log, fold, validate, append, move counters, commit. Any error
//! drops the transaction, so nothing is half-written. The counter update is
//! additionally a compare-and-swap on the referral's revision.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use ujb_commission::SlabPortion;
use ujb_db::queries::{entries, referrals};
use ujb_types::ledger::{Payment, Payout, SequencedEntry, Slot};
use ujb_types::referral::{Referral, ReferralCounters};
use ujb_types::Amount;

use crate::adjustment::{self, AdjustmentOutcome};
use crate::fold::LedgerState;
use crate::ingest::{self, PaymentRequest};
use crate::payout::{self, PayoutRequest};
use crate::{new_id, recipient, LedgerError, LedgerLog, Result};

/// Outcome of a committed payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub seq: u64,
    pub portions: Vec<SlabPortion>,
    pub counters: ReferralCounters,
    pub agreed_remaining: Amount,
    pub revision: u64,
}

/// Outcome of a committed payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub payout: Payout,
    pub seq: u64,
    pub adjustment: AdjustmentOutcome,
    /// What the slot can still draw from the payment afterwards.
    pub remaining: Amount,
    pub counters: ReferralCounters,
    pub revision: u64,
}

/// A referral's counters alongside the full fold of its log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub referral_id: String,
    pub counters: ReferralCounters,
    pub agreed_amount: Option<Amount>,
    pub agreed_remaining: Amount,
    pub revision: u64,
    pub state: LedgerState,
}

/// Record a client payment.
pub fn record_payment(conn: &mut Connection, request: &PaymentRequest, now: u64) -> Result<PaymentReceipt> {
    let tx = ujb_db::begin_write(conn)?;

    let referral = referrals::get(&tx, &request.referral_id)?;
    check_revision(&referral, request.expected_revision)?;
    let state = load_state(&*tx, &referral)?;

    let planned = ingest::plan_payment(&referral, &state, request, new_id("PAY"))?;

    let seq = entries::next_seq(&tx, &referral.referral_id)?;
    entries::append_payment(&tx, &planned.payment, seq, now)?;
    let revision = referrals::update_counters(
        &tx,
        &referral.referral_id,
        &planned.counters,
        referral.revision,
        now,
    )?;
    tx.commit()?;

    tracing::info!(
        referral_id = %referral.referral_id,
        payment_id = %planned.payment.payment_id,
        amount = planned.payment.amount_received,
        commission = planned.payment.commission,
        seq,
        "payment recorded"
    );

    Ok(PaymentReceipt {
        payment: planned.payment,
        seq,
        portions: planned.portions,
        counters: planned.counters,
        agreed_remaining: planned.agreed_remaining,
        revision,
    })
}

/// Pay one slot out of one payment, netting any standing adjustment.
pub fn request_payout(
    conn: &mut Connection,
    request: &PayoutRequest,
    platform_label: &str,
    now: u64,
) -> Result<PayoutReceipt> {
    let tx = ujb_db::begin_write(conn)?;

    let referral = referrals::get(&tx, &request.referral_id)?;
    check_revision(&referral, request.expected_revision)?;
    let state = load_state(&*tx, &referral)?;

    let before = payout::check(
        &state,
        &referral.referral_id,
        &request.from_payment_id,
        request.slot,
        request.amount,
    )?;

    let payout_id = new_id("PO");
    let recipient = recipient::resolve(&referral, request.slot, platform_label);
    let adjustment = match recipient.key.as_deref() {
        Some(key) => adjustment::consume_stored(&tx, key, request.amount, &payout_id, now)?,
        None => AdjustmentOutcome::default(),
    };

    let payout = payout::build(payout_id, request, recipient, adjustment);
    let counters = payout::apply_to_counters(&referral.counters, &payout)?;

    let seq = entries::next_seq(&tx, &referral.referral_id)?;
    entries::append_payout(&tx, &payout, seq, now)?;
    let revision = referrals::update_counters(&tx, &referral.referral_id, &counters, referral.revision, now)?;
    tx.commit()?;

    tracing::info!(
        referral_id = %referral.referral_id,
        payout_id = %payout.payout_id,
        payment_id = %payout.belongs_to_payment_id,
        slot = %payout.slot,
        logical = payout.logical_amount,
        cash = payout.cash_amount(),
        seq,
        "payout recorded"
    );

    Ok(PayoutReceipt {
        remaining: before - payout.logical_amount,
        payout,
        seq,
        adjustment,
        counters,
        revision,
    })
}

/// What `slot` can still draw from `payment_id`.
///
/// # Errors
///
/// - [`LedgerError::NotFound`] if the referral does not exist
/// - [`LedgerError::UnknownPayment`] if the payment is not on it
pub fn remaining_for(conn: &Connection, referral_id: &str, payment_id: &str, slot: Slot) -> Result<Amount> {
    let referral = referrals::get(conn, referral_id)?;
    let state = load_state(conn, &referral)?;
    state
        .remaining_for(payment_id, slot)
        .ok_or_else(|| LedgerError::UnknownPayment {
            referral_id: referral_id.to_string(),
            payment_id: payment_id.to_string(),
        })
}

/// Counters and folded balances of a referral.
pub fn summary(conn: &Connection, referral_id: &str) -> Result<LedgerSummary> {
    let referral = referrals::get(conn, referral_id)?;
    let state = load_state(conn, &referral)?;
    Ok(LedgerSummary {
        agreed_remaining: referral.agreed_remaining(),
        referral_id: referral.referral_id,
        counters: referral.counters,
        agreed_amount: referral.agreed_amount,
        revision: referral.revision,
        state,
    })
}

/// Log entries after `after_seq`, for incremental pulls.
pub fn entries_after(conn: &Connection, referral_id: &str, after_seq: u64) -> Result<Vec<SequencedEntry>> {
    referrals::get(conn, referral_id)?;
    Ok(entries::list_after(conn, referral_id, after_seq)?)
}

fn check_revision(referral: &Referral, expected: Option<u64>) -> Result<()> {
    match expected {
        Some(expected) if expected != referral.revision => Err(LedgerError::Conflict {
            referral_id: referral.referral_id.clone(),
            expected,
        }),
        _ => Ok(()),
    }
}

/// Fold the referral's log and check its stored counters agree.
fn load_state<L: LedgerLog + ?Sized>(log: &L, referral: &Referral) -> Result<LedgerState> {
    let entries = log.entries(&referral.referral_id)?;
    let state = LedgerState::fold(entries.iter().map(|e| &e.entry))?;
    state.verify_counters(&referral.counters)?;
    Ok(state)
}
