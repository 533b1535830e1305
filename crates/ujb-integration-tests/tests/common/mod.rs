//! Shared fixtures for the settlement integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use ujb_db::queries::referrals;
use ujb_ledger::ingest::PaymentRequest;
use ujb_ledger::payout::PayoutRequest;
use ujb_types::commission::{CommissionConfig, CommissionTerms, RateKind, Slab, StakeholderSplit};
use ujb_types::ledger::Slot;
use ujb_types::referral::{DealStatus, Party, Referral, ReferralCounters};
use ujb_types::Amount;

/// Simulated timestamp for deterministic testing.
pub const BASE_TIME: u64 = 1_700_000_000;

pub fn party(name: &str, code: &str) -> Party {
    Party {
        name: name.to_string(),
        ujb_code: Some(code.to_string()),
    }
}

/// `[0–50000 @10%, 50000–∞ @15%]`.
pub fn two_tier_slabs() -> CommissionConfig {
    CommissionConfig::Slabbed {
        slabs: vec![
            Slab {
                from: 0,
                to: Some(50_000),
                kind: RateKind::Percentage,
                value: 1_000,
            },
            Slab {
                from: 50_000,
                to: None,
                kind: RateKind::Percentage,
                value: 1_500,
            },
        ],
    }
}

/// Orbiter 40%, each mentor 10% of commission.
pub fn split_40_10_10() -> StakeholderSplit {
    StakeholderSplit {
        orbiter_bps: 4_000,
        orbiter_mentor_bps: 1_000,
        cosmo_mentor_bps: 1_000,
    }
}

/// A won referral with both mentors on file.
pub fn won_referral(referral_id: &str, config: CommissionConfig, agreed_amount: Amount) -> Referral {
    Referral {
        referral_id: referral_id.to_string(),
        orbiter: party("Asha", "UJB001"),
        cosmo: party("Ravi", "UJB002"),
        orbiter_mentor: Some(party("Meera", "UJB003")),
        cosmo_mentor: Some(party("Vikram", "UJB004")),
        commission: Some(CommissionTerms {
            config,
            split: split_40_10_10(),
        }),
        agreed_amount: Some(agreed_amount),
        status_history: vec![
            DealStatus::Pending,
            DealStatus::DiscussionInProgress,
            DealStatus::DealWon,
        ],
        counters: ReferralCounters::default(),
        revision: 0,
    }
}

pub fn insert(conn: &Connection, referral: &Referral) {
    referrals::upsert_terms(conn, referral, BASE_TIME).expect("upsert referral");
}

pub fn payment(referral_id: &str, amount: Amount) -> PaymentRequest {
    PaymentRequest {
        referral_id: referral_id.to_string(),
        amount_received: amount,
        payment_date: BASE_TIME,
        payment_from: "Ravi".to_string(),
        expected_revision: None,
    }
}

pub fn payout(referral_id: &str, payment_id: &str, slot: Slot, amount: Amount) -> PayoutRequest {
    PayoutRequest {
        referral_id: referral_id.to_string(),
        from_payment_id: payment_id.to_string(),
        slot,
        amount,
        tds_amount: 0,
        mode_of_payment: "NEFT".to_string(),
        transaction_ref: format!("UTR-{}", hex::encode(rand::random::<[u8; 4]>())),
        payment_date: BASE_TIME + 100,
        expected_revision: None,
    }
}

/// A fresh database file under the system temp dir.
pub struct TempDb {
    pub path: PathBuf,
}

impl TempDb {
    pub fn new() -> Self {
        let name = format!("ujb-test-{}.db", hex::encode(rand::random::<[u8; 8]>()));
        Self {
            path: std::env::temp_dir().join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(p);
        }
    }
}
