//! SQL schema definitions.

/// Complete schema for the v1 ledger database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Referrals (terms owned by the referral screens, counters by the ledger)
-- ============================================================

CREATE TABLE IF NOT EXISTS referrals (
    referral_id TEXT PRIMARY KEY,
    orbiter_name TEXT NOT NULL,
    orbiter_code TEXT,
    cosmo_name TEXT NOT NULL,
    cosmo_code TEXT,
    orbiter_mentor_name TEXT,
    orbiter_mentor_code TEXT,
    cosmo_mentor_name TEXT,
    cosmo_mentor_code TEXT,
    commission_json TEXT,
    agreed_amount INTEGER CHECK (agreed_amount IS NULL OR agreed_amount >= 0),
    status_history_json TEXT NOT NULL DEFAULT '[]',
    cosmo_paid INTEGER NOT NULL DEFAULT 0 CHECK (cosmo_paid >= 0),
    ujb_balance INTEGER NOT NULL DEFAULT 0 CHECK (ujb_balance >= 0),
    paid_to_orbiter INTEGER NOT NULL DEFAULT 0 CHECK (paid_to_orbiter >= 0),
    paid_to_orbiter_mentor INTEGER NOT NULL DEFAULT 0 CHECK (paid_to_orbiter_mentor >= 0),
    paid_to_cosmo_mentor INTEGER NOT NULL DEFAULT 0 CHECK (paid_to_cosmo_mentor >= 0),
    revision INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ============================================================
-- Ledger entries (append-only)
-- ============================================================

CREATE TABLE IF NOT EXISTS ledger_entries (
    entry_id TEXT PRIMARY KEY,
    referral_id TEXT NOT NULL REFERENCES referrals(referral_id),
    seq INTEGER NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('payment', 'payout')),
    -- amount_received for payments, logical_amount for payouts
    amount INTEGER NOT NULL CHECK (amount > 0),
    entry_date INTEGER NOT NULL,
    -- payment columns
    payment_from TEXT,
    commission INTEGER,
    dist_orbiter INTEGER,
    dist_orbiter_mentor INTEGER,
    dist_cosmo_mentor INTEGER,
    -- payout columns
    belongs_to_payment_id TEXT REFERENCES ledger_entries(entry_id),
    slot TEXT CHECK (slot IS NULL OR slot IN ('Orbiter', 'OrbiterMentor', 'CosmoMentor')),
    recipient_name TEXT,
    recipient_key TEXT,
    adjustment_deducted INTEGER,
    tds_amount INTEGER,
    mode_of_payment TEXT,
    transaction_ref TEXT,
    recorded_at INTEGER NOT NULL,
    UNIQUE (referral_id, seq),
    CHECK (kind = 'payout' OR (commission IS NOT NULL AND dist_orbiter IS NOT NULL
        AND dist_orbiter_mentor IS NOT NULL AND dist_cosmo_mentor IS NOT NULL)),
    CHECK (kind = 'payment' OR (belongs_to_payment_id IS NOT NULL AND slot IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_entries_referral ON ledger_entries(referral_id, seq);
CREATE INDEX IF NOT EXISTS idx_entries_payment ON ledger_entries(belongs_to_payment_id);

CREATE TRIGGER IF NOT EXISTS ledger_entries_no_update
BEFORE UPDATE ON ledger_entries
BEGIN
    SELECT RAISE(ABORT, 'ledger entries are append-only');
END;

CREATE TRIGGER IF NOT EXISTS ledger_entries_no_delete
BEFORE DELETE ON ledger_entries
BEGIN
    SELECT RAISE(ABORT, 'ledger entries are append-only');
END;

-- ============================================================
-- Standing adjustments
-- ============================================================

CREATE TABLE IF NOT EXISTS adjustments (
    recipient_key TEXT PRIMARY KEY,
    outstanding INTEGER NOT NULL CHECK (outstanding >= 0),
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS adjustment_events (
    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient_key TEXT NOT NULL,
    -- positive when a debt is registered, negative when consumed
    delta INTEGER NOT NULL,
    reason TEXT NOT NULL,
    payout_id TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_adjustment_events_key ON adjustment_events(recipient_key);
"#;
