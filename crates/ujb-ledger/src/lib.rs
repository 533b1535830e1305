//! # ujb-ledger
//!
//! Referral commission distribution and settlement ledger.
//!
//! A referral's ledger is an append-only log of client payments (money in)
//! and stakeholder payouts (money out). Everything else (what each slot has
//! earned, what it has been paid, what remains payable) is a fold over that
//! log.
//!
//! ## Modules
//!
//! - [`fold`]: Pure fold of the log into per-slot and per-payment balances
//! - [`ingest`]: Planning a client payment against a referral
//! - [`payout`]: Validating and building a payout
//! - [`adjustment`]: Netting standing deductions out of payout cash
//! - [`recipient`]: Resolving the member behind a slot
//! - [`settlement`]: Transactional commit of the above against SQLite

pub mod adjustment;
pub mod fold;
pub mod ingest;
pub mod payout;
pub mod recipient;
pub mod settlement;

use ujb_commission::CommissionError;
use ujb_db::DbError;
use ujb_types::ledger::{SequencedEntry, Slot};
use ujb_types::Amount;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed commission configuration.
    #[error("commission configuration error: {0}")]
    Commission(#[from] CommissionError),

    /// Referral carries no commission configuration.
    #[error("referral {0} has no commission configuration")]
    MissingCommission(String),

    /// Client payment would exceed the agreed deal value.
    #[error("payment of {amount} exceeds agreed remaining {remaining}")]
    Overpayment {
        amount: Amount,
        remaining: Amount,
    },

    /// Payout would exceed what the slot can still draw from the payment.
    #[error("payout of {requested} exceeds remaining {remaining} for {slot} on payment {payment_id}")]
    OverPayout {
        payment_id: String,
        slot: Slot,
        requested: Amount,
        remaining: Amount,
    },

    /// Payment recorded against a referral that was never won.
    #[error("referral {0} was never marked deal won")]
    DealNotWon(String),

    /// Referral has no negotiated deal value yet.
    #[error("referral {0} has no agreed amount")]
    AgreedAmountMissing(String),

    /// Amount is zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Payout references a payment that is not on this referral.
    #[error("payment {payment_id} not found on referral {referral_id}")]
    UnknownPayment {
        referral_id: String,
        payment_id: String,
    },

    /// Referral does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Terms edit contradicts the recorded ledger.
    #[error("invalid referral terms: {0}")]
    InvalidTerms(String),

    /// Another write landed on the referral first.
    #[error("referral {referral_id} changed concurrently (expected revision {expected})")]
    Conflict { referral_id: String, expected: u64 },

    /// Stored log or counters break a ledger invariant.
    #[error("ledger invariant violated: {0}")]
    Corrupt(String),

    /// Arithmetic overflow.
    #[error("arithmetic overflow in ledger calculation")]
    Overflow,

    /// Storage failure.
    #[error("database error: {0}")]
    Db(DbError),
}

impl From<DbError> for LedgerError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::StaleRevision {
                referral_id,
                expected,
            } => LedgerError::Conflict {
                referral_id,
                expected,
            },
            DbError::NotFound(what) => LedgerError::NotFound(what),
            DbError::InvalidTerms(why) => LedgerError::InvalidTerms(why),
            other => LedgerError::Db(other),
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Db(DbError::Sqlite(e))
    }
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// An ordered source of a referral's ledger entries.
///
/// Any store that preserves per-referral append order can back the ledger.
pub trait LedgerLog {
    /// Entries for `referral_id` in append order.
    fn entries(&self, referral_id: &str) -> Result<Vec<SequencedEntry>>;
}

impl LedgerLog for rusqlite::Connection {
    fn entries(&self, referral_id: &str) -> Result<Vec<SequencedEntry>> {
        Ok(ujb_db::queries::entries::list(self, referral_id)?)
    }
}

impl LedgerLog for [SequencedEntry] {
    fn entries(&self, referral_id: &str) -> Result<Vec<SequencedEntry>> {
        let mut out: Vec<SequencedEntry> = self
            .iter()
            .filter(|e| e.entry.referral_id() == referral_id)
            .cloned()
            .collect();
        out.sort_by_key(|e| e.seq);
        Ok(out)
    }
}

pub(crate) fn checked_add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(LedgerError::Overflow)
}

/// Fresh random identifier with a readable prefix.
pub(crate) fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", hex::encode(rand::random::<[u8; 8]>()))
}
