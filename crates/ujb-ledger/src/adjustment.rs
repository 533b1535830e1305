//! Standing adjustments netted out of payout cash.
//!
//! A recipient may owe the platform a debt unrelated to the referral (an
//! unpaid onboarding fee, say). When that recipient is paid, as much of the
//! debt as the payout can cover is withheld from the cash. The payout's
//! logical amount is unchanged, so the recipient's entitlement is still fully
//! settled in the ledger.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use ujb_db::queries::adjustments;
use ujb_types::Amount;

use crate::{LedgerError, Result};

/// Result of netting an adjustment against a payout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentOutcome {
    /// Cash withheld from the payout.
    pub deducted: Amount,
    /// Debt still outstanding afterwards.
    pub remaining_balance: Amount,
}

/// Net `outstanding` debt against `available` payout cash.
pub fn consume(outstanding: Amount, available: Amount) -> AdjustmentOutcome {
    let deducted = available.min(outstanding);
    AdjustmentOutcome {
        deducted,
        remaining_balance: outstanding - deducted,
    }
}

/// Net the stored adjustment for `recipient_key` against `available`, and
/// persist the reduced balance.
///
/// Must run inside the same transaction as the append of `payout_id`.
pub fn consume_stored(
    conn: &Connection,
    recipient_key: &str,
    available: Amount,
    payout_id: &str,
    now: u64,
) -> Result<AdjustmentOutcome> {
    let outstanding = adjustments::outstanding(conn, recipient_key)?;
    let outcome = consume(outstanding, available);

    if outcome.deducted > 0 {
        let balance = adjustments::deduct(conn, recipient_key, outcome.deducted, payout_id, now)?;
        if balance != outcome.remaining_balance {
            return Err(LedgerError::Corrupt(format!(
                "adjustment balance for {recipient_key} moved during payout"
            )));
        }
        tracing::info!(
            recipient_key,
            deducted = outcome.deducted,
            remaining = outcome.remaining_balance,
            payout_id,
            "adjustment consumed"
        );
    }

    Ok(outcome)
}

/// Register a new standing debt for a recipient. Returns the new balance.
pub fn register(conn: &mut Connection, recipient_key: &str, amount: Amount, reason: &str, now: u64) -> Result<Amount> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    let tx = ujb_db::begin_write(conn)?;
    let balance = adjustments::register(&tx, recipient_key, amount, reason, now)?;
    tx.commit()?;

    tracing::info!(recipient_key, amount, balance, reason, "adjustment registered");
    Ok(balance)
}

/// Outstanding debt for a recipient.
pub fn outstanding(conn: &Connection, recipient_key: &str) -> Result<Amount> {
    Ok(adjustments::outstanding(conn, recipient_key)?)
}
