//! Standing adjustment query functions.
//!
//! `adjustments.outstanding` holds the current balance per recipient; every
//! change is also written to `adjustment_events` for audit.

use rusqlite::{Connection, OptionalExtension};
use ujb_types::Amount;

use crate::{to_sql, DbError, Result};

/// Outstanding balance for a recipient (0 if none registered).
pub fn outstanding(conn: &Connection, recipient_key: &str) -> Result<Amount> {
    let balance: Option<i64> = conn
        .query_row(
            "SELECT outstanding FROM adjustments WHERE recipient_key = ?1",
            [recipient_key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(balance.map(|b| b as u64).unwrap_or(0))
}

/// Add `amount` to a recipient's outstanding balance. Returns the new balance.
pub fn register(
    conn: &Connection,
    recipient_key: &str,
    amount: Amount,
    reason: &str,
    now: u64,
) -> Result<Amount> {
    let current = outstanding(conn, recipient_key)?;
    let balance = current
        .checked_add(amount)
        .ok_or_else(|| DbError::Constraint("adjustment balance overflow".into()))?;

    conn.execute(
        "INSERT INTO adjustments (recipient_key, outstanding, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(recipient_key) DO UPDATE SET
            outstanding = excluded.outstanding, updated_at = excluded.updated_at",
        rusqlite::params![recipient_key, to_sql(balance)?, to_sql(now)?],
    )?;
    record_event(conn, recipient_key, to_sql(amount)?, reason, None, now)?;
    Ok(balance)
}

/// Reduce a recipient's balance by `amount` on behalf of `payout_id`.
///
/// Returns the new balance.
///
/// # Errors
///
/// - [`DbError::Constraint`] if `amount` exceeds the outstanding balance
pub fn deduct(
    conn: &Connection,
    recipient_key: &str,
    amount: Amount,
    payout_id: &str,
    now: u64,
) -> Result<Amount> {
    let current = outstanding(conn, recipient_key)?;
    let balance = current.checked_sub(amount).ok_or_else(|| {
        DbError::Constraint(format!(
            "deduction {amount} exceeds outstanding {current} for '{recipient_key}'"
        ))
    })?;

    conn.execute(
        "UPDATE adjustments SET outstanding = ?1, updated_at = ?2 WHERE recipient_key = ?3",
        rusqlite::params![to_sql(balance)?, to_sql(now)?, recipient_key],
    )?;
    record_event(
        conn,
        recipient_key,
        -to_sql(amount)?,
        "consumed by payout",
        Some(payout_id),
        now,
    )?;
    Ok(balance)
}

fn record_event(
    conn: &Connection,
    recipient_key: &str,
    delta: i64,
    reason: &str,
    payout_id: Option<&str>,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO adjustment_events (recipient_key, delta, reason, payout_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![recipient_key, delta, reason, payout_id, to_sql(now)?],
    )?;
    Ok(())
}

/// Audit history for a recipient, oldest first.
pub fn history(conn: &Connection, recipient_key: &str) -> Result<Vec<AdjustmentEventRow>> {
    let mut stmt = conn.prepare(
        "SELECT delta, reason, payout_id, created_at FROM adjustment_events
         WHERE recipient_key = ?1 ORDER BY event_id ASC",
    )?;
    let rows = stmt
        .query_map([recipient_key], |row| {
            Ok(AdjustmentEventRow {
                delta: row.get(0)?,
                reason: row.get(1)?,
                payout_id: row.get(2)?,
                created_at: row.get::<_, i64>(3)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// A raw adjustment event row.
#[derive(Debug)]
pub struct AdjustmentEventRow {
    /// Positive when registered, negative when consumed.
    pub delta: i64,
    pub reason: String,
    pub payout_id: Option<String>,
    pub created_at: u64,
}
