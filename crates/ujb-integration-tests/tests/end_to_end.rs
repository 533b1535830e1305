//! Integration test: referral settlement from first receipt to final payout.
//!
//! Exercises the complete ledger pipeline against SQLite:
//! 1. Upsert a won referral with a two-tier slab table
//! 2. Record client payments (commission resolved, distribution fixed)
//! 3. Pay out slots against individual payments
//! 4. Verify counters, the fold, and rejection of over-payouts
//!
//! This test uses only the library crates (ujb-db, ujb-ledger,
//! ujb-commission) without a running daemon.

mod common;

use common::*;
use ujb_commission::{resolve, ResolveInput};
use ujb_ledger::settlement::{self, record_payment, request_payout};
use ujb_ledger::LedgerError;
use ujb_types::commission::{CommissionConfig, CommissionTerms, RateKind};
use ujb_types::ledger::{LedgerEntry, Slot};
use ujb_types::PLATFORM_LABEL;

#[test]
fn referral_settlement_scenario() {
    let mut conn = ujb_db::open_memory().expect("open DB");
    insert(&conn, &won_referral("REF-1", two_tier_slabs(), 100_000));

    // =========================================================
    // Payment of 60000 spans both slabs
    // =========================================================
    let receipt = record_payment(&mut conn, &payment("REF-1", 60_000), BASE_TIME).expect("payment");
    assert_eq!(receipt.payment.commission, 6_500, "5000 + 1500");
    assert_eq!(receipt.payment.distribution.orbiter, 2_600);
    assert_eq!(receipt.payment.distribution.orbiter_mentor, 650);
    assert_eq!(receipt.payment.distribution.cosmo_mentor, 650);
    assert_eq!(receipt.counters.ujb_balance, 56_100, "60000 - 3900");
    assert_eq!(receipt.agreed_remaining, 40_000);
    let payment_id = receipt.payment.payment_id;

    // =========================================================
    // Full orbiter payout succeeds, a further unit does not
    // =========================================================
    let paid = request_payout(
        &mut conn,
        &payout("REF-1", &payment_id, Slot::Orbiter, 2_600),
        PLATFORM_LABEL,
        BASE_TIME + 100,
    )
    .expect("payout");
    assert_eq!(paid.remaining, 0);

    let err = request_payout(
        &mut conn,
        &payout("REF-1", &payment_id, Slot::Orbiter, 1),
        PLATFORM_LABEL,
        BASE_TIME + 200,
    )
    .expect_err("orbiter share exhausted");
    assert!(matches!(err, LedgerError::OverPayout { requested: 1, remaining: 0, .. }));

    // =========================================================
    // Verify stored state
    // =========================================================
    let summary = settlement::summary(&conn, "REF-1").expect("summary");
    assert_eq!(summary.counters.cosmo_paid, 60_000);
    assert_eq!(summary.counters.paid_to_orbiter, 2_600);
    assert_eq!(summary.agreed_remaining, 40_000);
    assert_eq!(summary.state.payment_count, 1);
    assert_eq!(summary.state.payout_count, 1);
    assert_eq!(
        settlement::remaining_for(&conn, "REF-1", &payment_id, Slot::OrbiterMentor).expect("remaining"),
        650
    );

    let log = settlement::entries_after(&conn, "REF-1", 0).expect("entries");
    assert_eq!(log.len(), 2);
    assert!(matches!(log[0].entry, LedgerEntry::Payment(_)));
    assert!(matches!(log[1].entry, LedgerEntry::Payout(_)));
}

#[test]
fn slab_partition_single_payment() {
    let terms = CommissionTerms {
        config: two_tier_slabs(),
        split: split_40_10_10(),
    };
    let resolution = resolve(
        &terms,
        ResolveInput {
            value_before: 0,
            increment: 80_000,
            commission_before: 0,
        },
    )
    .expect("resolve");
    assert_eq!(resolution.commission, 9_500, "50000 x 10% + 30000 x 15%");
}

#[test]
fn slab_commission_telescopes_across_payments() {
    let mut conn = ujb_db::open_memory().expect("open DB");
    insert(&conn, &won_referral("REF-2", two_tier_slabs(), 100_000));

    // Same 80000 as one payment, split in three
    let mut commission = 0;
    for amount in [30_000, 30_000, 20_000] {
        commission += record_payment(&mut conn, &payment("REF-2", amount), BASE_TIME)
            .expect("payment")
            .payment
            .commission;
    }
    assert_eq!(commission, 9_500);
}

#[test]
fn flat_fixed_amount_applies_once() {
    let mut conn = ujb_db::open_memory().expect("open DB");
    let flat = CommissionConfig::Flat {
        kind: RateKind::Amount,
        value: 1_000,
    };
    insert(&conn, &won_referral("REF-3", flat, 100_000));

    for amount in [10_000, 25_000, 5_000] {
        record_payment(&mut conn, &payment("REF-3", amount), BASE_TIME).expect("payment");
    }

    let summary = settlement::summary(&conn, "REF-3").expect("summary");
    assert_eq!(summary.state.commission_charged, 1_000, "not 3000");
}

#[test]
fn remaining_is_scoped_to_each_payment() {
    let mut conn = ujb_db::open_memory().expect("open DB");
    insert(&conn, &won_referral("REF-4", two_tier_slabs(), 100_000));

    let first = record_payment(&mut conn, &payment("REF-4", 10_000), BASE_TIME).expect("first");
    let second = record_payment(&mut conn, &payment("REF-4", 10_000), BASE_TIME).expect("second");
    assert_eq!(first.payment.distribution.orbiter, 400);
    assert_eq!(second.payment.distribution.orbiter, 400);

    // 800 earned across the referral, but no single payment covers it
    let err = request_payout(
        &mut conn,
        &payout("REF-4", &first.payment.payment_id, Slot::Orbiter, 800),
        PLATFORM_LABEL,
        BASE_TIME,
    )
    .expect_err("pooled payout");
    assert!(matches!(err, LedgerError::OverPayout { remaining: 400, .. }));

    for p in [&first, &second] {
        request_payout(
            &mut conn,
            &payout("REF-4", &p.payment.payment_id, Slot::Orbiter, 400),
            PLATFORM_LABEL,
            BASE_TIME,
        )
        .expect("per-payment payout");
    }
    let summary = settlement::summary(&conn, "REF-4").expect("summary");
    assert_eq!(summary.state.slots.orbiter.remaining(), 0);
}

#[test]
fn conservation_over_random_payments() {
    let mut conn = ujb_db::open_memory().expect("open DB");
    insert(&conn, &won_referral("REF-5", two_tier_slabs(), 10_000_000));

    let mut received = 0;
    for _ in 0..40 {
        let amount = rand::random::<u64>() % 50_000 + 1;
        let receipt = record_payment(&mut conn, &payment("REF-5", amount), BASE_TIME).expect("payment");
        received += amount;

        // Drain a random part of one slot of this payment
        let share = receipt.payment.distribution.orbiter_mentor;
        if share > 0 {
            let take = rand::random::<u64>() % share + 1;
            request_payout(
                &mut conn,
                &payout("REF-5", &receipt.payment.payment_id, Slot::OrbiterMentor, take),
                PLATFORM_LABEL,
                BASE_TIME,
            )
            .expect("payout");
        }
    }

    let summary = settlement::summary(&conn, "REF-5").expect("summary");
    let state = &summary.state;
    let distributed: u64 = Slot::ALL.iter().map(|s| state.slots.get(*s).earned).sum();
    assert_eq!(state.amount_received, received);
    assert!(distributed <= received);
    assert_eq!(summary.counters.cosmo_paid, received);
    assert_eq!(summary.counters.ujb_balance, received - distributed);
    for balance in &state.payments {
        for slot in Slot::ALL {
            let totals = balance.slots.get(slot);
            assert!(totals.paid <= totals.earned);
        }
    }
}

#[test]
fn payment_rejected_until_deal_won() {
    let mut conn = ujb_db::open_memory().expect("open DB");
    let mut referral = won_referral("REF-6", two_tier_slabs(), 100_000);
    referral.status_history = vec![ujb_types::referral::DealStatus::DiscussionInProgress];
    insert(&conn, &referral);

    let err = record_payment(&mut conn, &payment("REF-6", 1_000), BASE_TIME).expect_err("not won");
    assert!(matches!(err, LedgerError::DealNotWon(_)));

    ujb_db::queries::referrals::push_status(&conn, "REF-6", ujb_types::referral::DealStatus::DealWon, BASE_TIME)
        .expect("won");
    ujb_db::queries::referrals::push_status(&conn, "REF-6", ujb_types::referral::DealStatus::Hold, BASE_TIME)
        .expect("hold");
    record_payment(&mut conn, &payment("REF-6", 1_000), BASE_TIME).expect("payable once won");
}
