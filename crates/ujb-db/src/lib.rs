//! # ujb-db
//!
//! Database access layer for the settlement ledger.
//! Manages the single SQLite database at `$UJB_DATA_DIR/ledger.db`.
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - Ledger entries are append-only (enforced by triggers)
//! - All timestamps are Unix epoch seconds (u64)
//! - Schema version stored in `PRAGMA user_version`
//!
//! Ledger writes must run inside a `BEGIN IMMEDIATE` transaction (see
//! [`begin_write`]) so the read of current state and the append that depends
//! on it are serialized against other writers.

pub mod migrations;
pub mod queries;
pub mod schema;

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Default time a writer waits for the database lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Terms edit would contradict what the ledger already recorded.
    #[error("invalid terms: {0}")]
    InvalidTerms(String),

    /// The referral changed since it was read.
    #[error("referral {referral_id} is no longer at revision {expected}")]
    StaleRevision { referral_id: String, expected: u64 },
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl From<ujb_types::UnknownVariant> for DbError {
    fn from(e: ujb_types::UnknownVariant) -> Self {
        DbError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the ledger database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

/// Open or create the ledger database with a specific busy timeout.
pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Start a write transaction that takes the database write lock up front.
pub fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -8000;",
    )?;
    Ok(())
}

/// Convert an unsigned amount for storage in an INTEGER column.
pub(crate) fn to_sql(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| DbError::Constraint(format!("value {value} exceeds INTEGER range")))
}
