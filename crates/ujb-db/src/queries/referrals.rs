//! Referral query functions.
//!
//! Terms (parties, commission, agreed amount, status history) are written by
//! the referral screens through [`upsert_terms`]; counters are written only by
//! the ledger through [`update_counters`]. Every write bumps `revision`.

use rusqlite::{Connection, OptionalExtension, Row};
use ujb_types::commission::CommissionTerms;
use ujb_types::referral::{DealStatus, Party, Referral, ReferralCounters};
use ujb_types::Amount;

use crate::{to_sql, DbError, Result};

const SELECT_COLUMNS: &str = "referral_id, orbiter_name, orbiter_code, cosmo_name, cosmo_code,
     orbiter_mentor_name, orbiter_mentor_code, cosmo_mentor_name, cosmo_mentor_code,
     commission_json, agreed_amount, status_history_json,
     cosmo_paid, ujb_balance, paid_to_orbiter, paid_to_orbiter_mentor, paid_to_cosmo_mentor,
     revision";

/// Insert a referral, or update its terms if it already exists.
///
/// Counters of an existing referral are preserved and its revision is
/// bumped. Its status history is also preserved: once a referral exists the
/// history only grows through [`push_status`]. Returns the referral as stored.
///
/// # Errors
///
/// - [`DbError::InvalidTerms`] if the new agreed amount is missing or below
///   what has already been received
pub fn upsert_terms(conn: &Connection, referral: &Referral, now: u64) -> Result<Referral> {
    if let Some(existing) = find(conn, &referral.referral_id)? {
        check_agreed_amount(&existing, referral.agreed_amount)?;
        if existing.status_history != referral.status_history {
            tracing::debug!(
                referral_id = %referral.referral_id,
                "status history kept on terms edit"
            );
        }
    }

    let commission_json = referral
        .commission
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let history_json = serde_json::to_string(&referral.status_history)?;
    let agreed = referral.agreed_amount.map(to_sql).transpose()?;

    conn.execute(
        "INSERT INTO referrals (
            referral_id, orbiter_name, orbiter_code, cosmo_name, cosmo_code,
            orbiter_mentor_name, orbiter_mentor_code, cosmo_mentor_name, cosmo_mentor_code,
            commission_json, agreed_amount, status_history_json, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
         ON CONFLICT(referral_id) DO UPDATE SET
            orbiter_name = excluded.orbiter_name,
            orbiter_code = excluded.orbiter_code,
            cosmo_name = excluded.cosmo_name,
            cosmo_code = excluded.cosmo_code,
            orbiter_mentor_name = excluded.orbiter_mentor_name,
            orbiter_mentor_code = excluded.orbiter_mentor_code,
            cosmo_mentor_name = excluded.cosmo_mentor_name,
            cosmo_mentor_code = excluded.cosmo_mentor_code,
            commission_json = excluded.commission_json,
            agreed_amount = excluded.agreed_amount,
            revision = revision + 1,
            updated_at = excluded.updated_at",
        rusqlite::params![
            referral.referral_id,
            referral.orbiter.name,
            referral.orbiter.ujb_code,
            referral.cosmo.name,
            referral.cosmo.ujb_code,
            referral.orbiter_mentor.as_ref().map(|p| p.name.as_str()),
            referral.orbiter_mentor.as_ref().and_then(|p| p.ujb_code.as_deref()),
            referral.cosmo_mentor.as_ref().map(|p| p.name.as_str()),
            referral.cosmo_mentor.as_ref().and_then(|p| p.ujb_code.as_deref()),
            commission_json,
            agreed,
            history_json,
            to_sql(now)?,
        ],
    )?;

    get(conn, &referral.referral_id)
}

/// Get a referral by ID.
pub fn get(conn: &Connection, referral_id: &str) -> Result<Referral> {
    find(conn, referral_id)?.ok_or_else(|| DbError::NotFound(format!("referral '{referral_id}'")))
}

/// Get a referral by ID, `None` if absent.
pub fn find(conn: &Connection, referral_id: &str) -> Result<Option<Referral>> {
    let row = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM referrals WHERE referral_id = ?1"),
            [referral_id],
            RawReferral::from_row,
        )
        .optional()?;
    row.map(RawReferral::into_referral).transpose()
}

/// List referrals, most recently updated first.
pub fn list(conn: &Connection, limit: u32) -> Result<Vec<Referral>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM referrals ORDER BY updated_at DESC, referral_id LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map([limit], RawReferral::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(RawReferral::into_referral).collect()
}

/// Append a status to the referral's history.
pub fn push_status(conn: &Connection, referral_id: &str, status: DealStatus, now: u64) -> Result<Referral> {
    let mut referral = get(conn, referral_id)?;
    referral.status_history.push(status);
    let history_json = serde_json::to_string(&referral.status_history)?;
    conn.execute(
        "UPDATE referrals SET status_history_json = ?1, revision = revision + 1, updated_at = ?2
         WHERE referral_id = ?3",
        rusqlite::params![history_json, to_sql(now)?, referral_id],
    )?;
    get(conn, referral_id)
}

/// Set the negotiated deal value.
///
/// # Errors
///
/// - [`DbError::InvalidTerms`] if `amount` is below what has already been received
pub fn set_agreed_amount(conn: &Connection, referral_id: &str, amount: Amount, now: u64) -> Result<Referral> {
    let existing = get(conn, referral_id)?;
    check_agreed_amount(&existing, Some(amount))?;
    conn.execute(
        "UPDATE referrals SET agreed_amount = ?1, revision = revision + 1, updated_at = ?2
         WHERE referral_id = ?3",
        rusqlite::params![to_sql(amount)?, to_sql(now)?, referral_id],
    )?;
    get(conn, referral_id)
}

/// A referral with payments on record must keep an agreed amount covering them.
fn check_agreed_amount(existing: &Referral, agreed: Option<Amount>) -> Result<()> {
    let received = existing.counters.cosmo_paid;
    match agreed {
        None if received > 0 => Err(DbError::InvalidTerms(format!(
            "referral '{}' has received {received}; agreed amount cannot be cleared",
            existing.referral_id
        ))),
        Some(amount) if amount < received => Err(DbError::InvalidTerms(format!(
            "agreed amount {amount} is below {received} already received on referral '{}'",
            existing.referral_id
        ))),
        _ => Ok(()),
    }
}

/// Overwrite ledger counters if the referral is still at `expected_revision`.
///
/// Returns the new revision.
///
/// # Errors
///
/// - [`DbError::StaleRevision`] if another write landed since the referral was read
pub fn update_counters(
    conn: &Connection,
    referral_id: &str,
    counters: &ReferralCounters,
    expected_revision: u64,
    now: u64,
) -> Result<u64> {
    let updated = conn.execute(
        "UPDATE referrals SET
            cosmo_paid = ?1, ujb_balance = ?2, paid_to_orbiter = ?3,
            paid_to_orbiter_mentor = ?4, paid_to_cosmo_mentor = ?5,
            revision = revision + 1, updated_at = ?6
         WHERE referral_id = ?7 AND revision = ?8",
        rusqlite::params![
            to_sql(counters.cosmo_paid)?,
            to_sql(counters.ujb_balance)?,
            to_sql(counters.paid_to_orbiter)?,
            to_sql(counters.paid_to_orbiter_mentor)?,
            to_sql(counters.paid_to_cosmo_mentor)?,
            to_sql(now)?,
            referral_id,
            to_sql(expected_revision)?,
        ],
    )?;
    if updated == 0 {
        return Err(DbError::StaleRevision {
            referral_id: referral_id.to_string(),
            expected: expected_revision,
        });
    }
    Ok(expected_revision + 1)
}

/// Columns as read from SQLite, before JSON decoding.
struct RawReferral {
    referral_id: String,
    orbiter_name: String,
    orbiter_code: Option<String>,
    cosmo_name: String,
    cosmo_code: Option<String>,
    orbiter_mentor_name: Option<String>,
    orbiter_mentor_code: Option<String>,
    cosmo_mentor_name: Option<String>,
    cosmo_mentor_code: Option<String>,
    commission_json: Option<String>,
    agreed_amount: Option<i64>,
    status_history_json: String,
    counters: ReferralCounters,
    revision: u64,
}

impl RawReferral {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            referral_id: row.get(0)?,
            orbiter_name: row.get(1)?,
            orbiter_code: row.get(2)?,
            cosmo_name: row.get(3)?,
            cosmo_code: row.get(4)?,
            orbiter_mentor_name: row.get(5)?,
            orbiter_mentor_code: row.get(6)?,
            cosmo_mentor_name: row.get(7)?,
            cosmo_mentor_code: row.get(8)?,
            commission_json: row.get(9)?,
            agreed_amount: row.get(10)?,
            status_history_json: row.get(11)?,
            counters: ReferralCounters {
                cosmo_paid: row.get::<_, i64>(12)? as u64,
                ujb_balance: row.get::<_, i64>(13)? as u64,
                paid_to_orbiter: row.get::<_, i64>(14)? as u64,
                paid_to_orbiter_mentor: row.get::<_, i64>(15)? as u64,
                paid_to_cosmo_mentor: row.get::<_, i64>(16)? as u64,
            },
            revision: row.get::<_, i64>(17)? as u64,
        })
    }

    fn into_referral(self) -> Result<Referral> {
        let commission = self
            .commission_json
            .as_deref()
            .map(serde_json::from_str::<CommissionTerms>)
            .transpose()?;
        let status_history: Vec<DealStatus> = serde_json::from_str(&self.status_history_json)?;

        Ok(Referral {
            referral_id: self.referral_id,
            orbiter: Party {
                name: self.orbiter_name,
                ujb_code: self.orbiter_code,
            },
            cosmo: Party {
                name: self.cosmo_name,
                ujb_code: self.cosmo_code,
            },
            orbiter_mentor: self.orbiter_mentor_name.map(|name| Party {
                name,
                ujb_code: self.orbiter_mentor_code,
            }),
            cosmo_mentor: self.cosmo_mentor_name.map(|name| Party {
                name,
                ujb_code: self.cosmo_mentor_code,
            }),
            commission,
            agreed_amount: self.agreed_amount.map(|a| a as u64),
            status_history,
            counters: self.counters,
            revision: self.revision,
        })
    }
}
