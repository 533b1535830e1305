//! Ledger entry query functions.
//!
//! Payments and payouts share one table keyed by `(referral_id, seq)`; `seq`
//! is the referral's append order and is assigned by [`next_seq`] inside the
//! caller's write transaction.

use rusqlite::{Connection, Row};
use ujb_types::ledger::{
    AdjustmentDeduction, Distribution, EntryKind, LedgerEntry, Payment, Payout, Recipient,
    SequencedEntry, Slot,
};

use crate::{to_sql, DbError, Result};

const SELECT_COLUMNS: &str = "seq, kind, entry_id, referral_id, amount, entry_date,
     payment_from, commission, dist_orbiter, dist_orbiter_mentor, dist_cosmo_mentor,
     belongs_to_payment_id, slot, recipient_name, recipient_key, adjustment_deducted,
     tds_amount, mode_of_payment, transaction_ref";

/// Next sequence number for a referral's ledger.
pub fn next_seq(conn: &Connection, referral_id: &str) -> Result<u64> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(seq) FROM ledger_entries WHERE referral_id = ?1",
        [referral_id],
        |row| row.get(0),
    )?;
    Ok(max.map(|m| m as u64 + 1).unwrap_or(1))
}

/// Append a payment at `seq`.
pub fn append_payment(conn: &Connection, payment: &Payment, seq: u64, now: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO ledger_entries (
            entry_id, referral_id, seq, kind, amount, entry_date, payment_from, commission,
            dist_orbiter, dist_orbiter_mentor, dist_cosmo_mentor, recorded_at)
         VALUES (?1, ?2, ?3, 'payment', ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            payment.payment_id,
            payment.referral_id,
            to_sql(seq)?,
            to_sql(payment.amount_received)?,
            to_sql(payment.payment_date)?,
            payment.payment_from,
            to_sql(payment.commission)?,
            to_sql(payment.distribution.orbiter)?,
            to_sql(payment.distribution.orbiter_mentor)?,
            to_sql(payment.distribution.cosmo_mentor)?,
            to_sql(now)?,
        ],
    )?;
    Ok(())
}

/// Append a payout at `seq`.
pub fn append_payout(conn: &Connection, payout: &Payout, seq: u64, now: u64) -> Result<()> {
    let deducted = payout.adjustment.map(|a| to_sql(a.deducted)).transpose()?;
    conn.execute(
        "INSERT INTO ledger_entries (
            entry_id, referral_id, seq, kind, amount, entry_date, belongs_to_payment_id, slot,
            recipient_name, recipient_key, adjustment_deducted, tds_amount, mode_of_payment,
            transaction_ref, recorded_at)
         VALUES (?1, ?2, ?3, 'payout', ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        rusqlite::params![
            payout.payout_id,
            payout.referral_id,
            to_sql(seq)?,
            to_sql(payout.logical_amount)?,
            to_sql(payout.payment_date)?,
            payout.belongs_to_payment_id,
            payout.slot.as_str(),
            payout.recipient.name,
            payout.recipient.key,
            deducted,
            to_sql(payout.tds_amount)?,
            payout.mode_of_payment,
            payout.transaction_ref,
            to_sql(now)?,
        ],
    )?;
    Ok(())
}

/// All entries of a referral in append order.
pub fn list(conn: &Connection, referral_id: &str) -> Result<Vec<SequencedEntry>> {
    list_after(conn, referral_id, 0)
}

/// Entries of a referral with `seq > after_seq`, in append order.
pub fn list_after(conn: &Connection, referral_id: &str, after_seq: u64) -> Result<Vec<SequencedEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM ledger_entries
         WHERE referral_id = ?1 AND seq > ?2 ORDER BY seq ASC"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![referral_id, to_sql(after_seq)?], RawEntry::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(RawEntry::into_entry).collect()
}

/// Columns as read from SQLite.
struct RawEntry {
    seq: i64,
    kind: String,
    entry_id: String,
    referral_id: String,
    amount: i64,
    entry_date: i64,
    payment_from: Option<String>,
    commission: Option<i64>,
    dist: [Option<i64>; 3],
    belongs_to_payment_id: Option<String>,
    slot: Option<String>,
    recipient_name: Option<String>,
    recipient_key: Option<String>,
    adjustment_deducted: Option<i64>,
    tds_amount: Option<i64>,
    mode_of_payment: Option<String>,
    transaction_ref: Option<String>,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get(0)?,
            kind: row.get(1)?,
            entry_id: row.get(2)?,
            referral_id: row.get(3)?,
            amount: row.get(4)?,
            entry_date: row.get(5)?,
            payment_from: row.get(6)?,
            commission: row.get(7)?,
            dist: [row.get(8)?, row.get(9)?, row.get(10)?],
            belongs_to_payment_id: row.get(11)?,
            slot: row.get(12)?,
            recipient_name: row.get(13)?,
            recipient_key: row.get(14)?,
            adjustment_deducted: row.get(15)?,
            tds_amount: row.get(16)?,
            mode_of_payment: row.get(17)?,
            transaction_ref: row.get(18)?,
        })
    }

    fn into_entry(self) -> Result<SequencedEntry> {
        let entry = match self.kind.parse::<EntryKind>()? {
            EntryKind::Payment => {
                let [orbiter, orbiter_mentor, cosmo_mentor] = self.dist;
                LedgerEntry::Payment(Payment {
                    payment_id: self.entry_id,
                    referral_id: self.referral_id,
                    amount_received: self.amount as u64,
                    payment_date: self.entry_date as u64,
                    payment_from: self.payment_from.unwrap_or_default(),
                    commission: required(self.commission, "commission")?,
                    distribution: Distribution {
                        orbiter: required(orbiter, "dist_orbiter")?,
                        orbiter_mentor: required(orbiter_mentor, "dist_orbiter_mentor")?,
                        cosmo_mentor: required(cosmo_mentor, "dist_cosmo_mentor")?,
                    },
                })
            }
            EntryKind::Payout => {
                let slot: Slot = self
                    .slot
                    .as_deref()
                    .ok_or_else(|| DbError::Serialization("payout row without slot".into()))?
                    .parse()?;
                LedgerEntry::Payout(Payout {
                    payout_id: self.entry_id,
                    referral_id: self.referral_id,
                    belongs_to_payment_id: self.belongs_to_payment_id.ok_or_else(|| {
                        DbError::Serialization("payout row without payment reference".into())
                    })?,
                    slot,
                    recipient: Recipient {
                        name: self.recipient_name.unwrap_or_default(),
                        key: self.recipient_key,
                    },
                    logical_amount: self.amount as u64,
                    adjustment: self.adjustment_deducted.map(|d| AdjustmentDeduction {
                        deducted: d as u64,
                    }),
                    tds_amount: self.tds_amount.unwrap_or(0) as u64,
                    mode_of_payment: self.mode_of_payment.unwrap_or_default(),
                    transaction_ref: self.transaction_ref.unwrap_or_default(),
                    payment_date: self.entry_date as u64,
                })
            }
        };
        Ok(SequencedEntry {
            seq: self.seq as u64,
            entry,
        })
    }
}

fn required(value: Option<i64>, column: &str) -> Result<u64> {
    value
        .map(|v| v as u64)
        .ok_or_else(|| DbError::Serialization(format!("payment row missing {column}")))
}
