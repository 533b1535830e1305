//! Validating and building a payout.

use serde::{Deserialize, Serialize};
use ujb_types::ledger::{AdjustmentDeduction, Payout, Recipient, Slot};
use ujb_types::referral::ReferralCounters;
use ujb_types::{Amount, PaymentId, PayoutId, ReferralId};

use crate::adjustment::AdjustmentOutcome;
use crate::fold::LedgerState;
use crate::{checked_add, LedgerError, Result};

/// A request to pay one slot out of one payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub referral_id: ReferralId,
    pub from_payment_id: PaymentId,
    pub slot: Slot,
    /// Logical amount to settle.
    pub amount: Amount,
    #[serde(default)]
    pub tds_amount: Amount,
    pub mode_of_payment: String,
    pub transaction_ref: String,
    /// Unix timestamp (seconds).
    pub payment_date: u64,
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

/// Check that `slot` can draw `amount` from `payment_id`. Returns what it
/// could draw before this payout.
///
/// # Errors
///
/// - [`LedgerError::ZeroAmount`] if `amount` is zero
/// - [`LedgerError::UnknownPayment`] if the payment is not on this referral
/// - [`LedgerError::OverPayout`] if `amount` exceeds the remaining
pub fn check(state: &LedgerState, referral_id: &str, payment_id: &str, slot: Slot, amount: Amount) -> Result<Amount> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    let remaining = state
        .remaining_for(payment_id, slot)
        .ok_or_else(|| LedgerError::UnknownPayment {
            referral_id: referral_id.to_string(),
            payment_id: payment_id.to_string(),
        })?;
    if amount > remaining {
        return Err(LedgerError::OverPayout {
            payment_id: payment_id.to_string(),
            slot,
            requested: amount,
            remaining,
        });
    }
    Ok(remaining)
}

/// Assemble the payout entry.
pub fn build(
    payout_id: PayoutId,
    request: &PayoutRequest,
    recipient: Recipient,
    adjustment: AdjustmentOutcome,
) -> Payout {
    Payout {
        payout_id,
        referral_id: request.referral_id.clone(),
        belongs_to_payment_id: request.from_payment_id.clone(),
        slot: request.slot,
        recipient,
        logical_amount: request.amount,
        adjustment: (adjustment.deducted > 0).then_some(AdjustmentDeduction {
            deducted: adjustment.deducted,
        }),
        tds_amount: request.tds_amount,
        mode_of_payment: request.mode_of_payment.clone(),
        transaction_ref: request.transaction_ref.clone(),
        payment_date: request.payment_date,
    }
}

/// Counters after `payout`: the slot's paid counter moves by the cash sent.
pub fn apply_to_counters(counters: &ReferralCounters, payout: &Payout) -> Result<ReferralCounters> {
    let mut next = *counters;
    let cash = payout.cash_amount();
    let field = match payout.slot {
        Slot::Orbiter => &mut next.paid_to_orbiter,
        Slot::OrbiterMentor => &mut next.paid_to_orbiter_mentor,
        Slot::CosmoMentor => &mut next.paid_to_cosmo_mentor,
    };
    *field = checked_add(*field, cash)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ujb_types::ledger::{Distribution, LedgerEntry, Payment};

    fn state() -> LedgerState {
        let log = vec![LedgerEntry::Payment(Payment {
            payment_id: "p1".to_string(),
            referral_id: "r1".to_string(),
            amount_received: 60_000,
            payment_date: 0,
            payment_from: "Ravi".to_string(),
            commission: 6_500,
            distribution: Distribution {
                orbiter: 2_600,
                orbiter_mentor: 650,
                cosmo_mentor: 650,
            },
        })];
        LedgerState::fold(&log).expect("fold")
    }

    fn request(amount: Amount) -> PayoutRequest {
        PayoutRequest {
            referral_id: "r1".to_string(),
            from_payment_id: "p1".to_string(),
            slot: Slot::Orbiter,
            amount,
            tds_amount: 0,
            mode_of_payment: "NEFT".to_string(),
            transaction_ref: "UTR1".to_string(),
            payment_date: 0,
            expected_revision: None,
        }
    }

    #[test]
    fn test_check_within_remaining() {
        assert_eq!(check(&state(), "r1", "p1", Slot::Orbiter, 2_600).expect("check"), 2_600);
    }

    #[test]
    fn test_check_over_payout() {
        let err = check(&state(), "r1", "p1", Slot::CosmoMentor, 651).expect_err("over");
        assert!(matches!(
            err,
            LedgerError::OverPayout {
                requested: 651,
                remaining: 650,
                ..
            }
        ));
    }

    #[test]
    fn test_check_unknown_payment() {
        let err = check(&state(), "r1", "p9", Slot::Orbiter, 1).expect_err("unknown");
        assert!(matches!(err, LedgerError::UnknownPayment { .. }));
    }

    #[test]
    fn test_check_zero() {
        assert!(matches!(
            check(&state(), "r1", "p1", Slot::Orbiter, 0),
            Err(LedgerError::ZeroAmount)
        ));
    }

    #[test]
    fn test_build_without_deduction() {
        let payout = build(
            "po-1".into(),
            &request(1_500),
            Recipient {
                name: "Asha".into(),
                key: None,
            },
            AdjustmentOutcome::default(),
        );
        assert_eq!(payout.adjustment, None);
        assert_eq!(payout.cash_amount(), 1_500);
    }

    #[test]
    fn test_counters_move_by_cash() {
        let payout = build(
            "po-1".into(),
            &request(1_500),
            Recipient {
                name: "Asha".into(),
                key: Some("UJB001".into()),
            },
            AdjustmentOutcome {
                deducted: 1_000,
                remaining_balance: 0,
            },
        );
        let counters = apply_to_counters(&ReferralCounters::default(), &payout).expect("apply");
        assert_eq!(counters.paid_to_orbiter, 500);
        assert_eq!(counters.paid_to_cosmo_mentor, 0);
    }
}
