//! Pure fold of a referral's ledger into balances.
//!
//! For each slot:
//!
//! ```text
//! earned    = Σ payment.distribution[slot]
//! paid      = Σ payout.logical_amount          (credited against earned)
//! cash_paid = Σ payout.logical_amount − deducted
//! remaining = earned − paid                     (never negative)
//! ```
//!
//! The same figures are kept per originating payment, since a payout may only
//! draw on the payment it names.

use serde::{Deserialize, Serialize};
use ujb_types::ledger::{Distribution, LedgerEntry, Payment, Payout, Slot};
use ujb_types::referral::ReferralCounters;
use ujb_types::{Amount, PaymentId};

use crate::{checked_add, LedgerError, Result};

/// Earned/paid totals for one slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTotals {
    pub earned: Amount,
    /// Logical amounts settled.
    pub paid: Amount,
    /// Cash actually transferred.
    pub cash_paid: Amount,
    /// Cash withheld against adjustments.
    pub deducted: Amount,
}

impl SlotTotals {
    pub fn remaining(&self) -> Amount {
        self.earned.saturating_sub(self.paid)
    }

    fn credit_payout(&mut self, payout: &Payout) -> Result<()> {
        self.paid = checked_add(self.paid, payout.logical_amount)?;
        self.cash_paid = checked_add(self.cash_paid, payout.cash_amount())?;
        self.deducted = checked_add(self.deducted, payout.deducted())?;
        Ok(())
    }
}

/// A value per slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSlot<T> {
    pub orbiter: T,
    pub orbiter_mentor: T,
    pub cosmo_mentor: T,
}

impl<T> PerSlot<T> {
    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::Orbiter => &self.orbiter,
            Slot::OrbiterMentor => &self.orbiter_mentor,
            Slot::CosmoMentor => &self.cosmo_mentor,
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut T {
        match slot {
            Slot::Orbiter => &mut self.orbiter,
            Slot::OrbiterMentor => &mut self.orbiter_mentor,
            Slot::CosmoMentor => &mut self.cosmo_mentor,
        }
    }
}

/// Balances scoped to one originating payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBalance {
    pub payment_id: PaymentId,
    pub amount_received: Amount,
    pub commission: Amount,
    pub distribution: Distribution,
    pub slots: PerSlot<SlotTotals>,
}

impl PaymentBalance {
    fn open(payment: &Payment) -> Self {
        let d = &payment.distribution;
        let earned = |amount| SlotTotals {
            earned: amount,
            ..SlotTotals::default()
        };
        Self {
            payment_id: payment.payment_id.clone(),
            amount_received: payment.amount_received,
            commission: payment.commission,
            distribution: *d,
            slots: PerSlot {
                orbiter: earned(d.orbiter),
                orbiter_mentor: earned(d.orbiter_mentor),
                cosmo_mentor: earned(d.cosmo_mentor),
            },
        }
    }
}

/// Derived state of one referral's ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Payments in append order.
    pub payments: Vec<PaymentBalance>,
    /// Referral-wide totals per slot.
    pub slots: PerSlot<SlotTotals>,
    /// Σ amount_received.
    pub amount_received: Amount,
    /// Σ commission across payments.
    pub commission_charged: Amount,
    /// Σ (amount_received − distribution total), the platform's share.
    pub retained: Amount,
    pub payment_count: usize,
    pub payout_count: usize,
}

impl LedgerState {
    /// Fold entries (in append order) into balances.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Corrupt`] if a payout names an unknown or later payment,
    ///   overdraws its payment, or a payment distributes more than it received
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn fold<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut state = Self::default();
        for entry in entries {
            state.apply(entry)?;
        }
        Ok(state)
    }

    /// Apply one entry to the state.
    pub fn apply(&mut self, entry: &LedgerEntry) -> Result<()> {
        match entry {
            LedgerEntry::Payment(payment) => self.apply_payment(payment),
            LedgerEntry::Payout(payout) => self.apply_payout(payout),
        }
    }

    fn apply_payment(&mut self, payment: &Payment) -> Result<()> {
        let distributed = payment.distribution.total().ok_or(LedgerError::Overflow)?;
        if distributed > payment.commission || payment.commission > payment.amount_received {
            return Err(LedgerError::Corrupt(format!(
                "payment {} distributes {distributed} of commission {} on {} received",
                payment.payment_id, payment.commission, payment.amount_received
            )));
        }
        if self.payment(&payment.payment_id).is_some() {
            return Err(LedgerError::Corrupt(format!(
                "duplicate payment {}",
                payment.payment_id
            )));
        }

        self.amount_received = checked_add(self.amount_received, payment.amount_received)?;
        self.commission_charged = checked_add(self.commission_charged, payment.commission)?;
        self.retained = checked_add(self.retained, payment.amount_received - distributed)?;
        for slot in Slot::ALL {
            let totals = self.slots.get_mut(slot);
            totals.earned = checked_add(totals.earned, payment.distribution.get(slot))?;
        }
        self.payments.push(PaymentBalance::open(payment));
        self.payment_count += 1;
        Ok(())
    }

    fn apply_payout(&mut self, payout: &Payout) -> Result<()> {
        let balance = self
            .payments
            .iter_mut()
            .find(|p| p.payment_id == payout.belongs_to_payment_id)
            .ok_or_else(|| {
                LedgerError::Corrupt(format!(
                    "payout {} draws on unknown payment {}",
                    payout.payout_id, payout.belongs_to_payment_id
                ))
            })?;

        let scoped = balance.slots.get_mut(payout.slot);
        if payout.logical_amount > scoped.remaining() || payout.deducted() > payout.logical_amount {
            return Err(LedgerError::Corrupt(format!(
                "payout {} of {} overdraws {} remaining on payment {}",
                payout.payout_id,
                payout.logical_amount,
                scoped.remaining(),
                payout.belongs_to_payment_id
            )));
        }
        scoped.credit_payout(payout)?;
        self.slots.get_mut(payout.slot).credit_payout(payout)?;
        self.payout_count += 1;
        Ok(())
    }

    pub fn payment(&self, payment_id: &str) -> Option<&PaymentBalance> {
        self.payments.iter().find(|p| p.payment_id == payment_id)
    }

    /// What `slot` can still draw from `payment_id`; `None` if the payment is unknown.
    pub fn remaining_for(&self, payment_id: &str, slot: Slot) -> Option<Amount> {
        self.payment(payment_id).map(|p| p.slots.get(slot).remaining())
    }

    /// Referral counters implied by the log.
    pub fn expected_counters(&self) -> ReferralCounters {
        ReferralCounters {
            cosmo_paid: self.amount_received,
            ujb_balance: self.retained,
            paid_to_orbiter: self.slots.orbiter.cash_paid,
            paid_to_orbiter_mentor: self.slots.orbiter_mentor.cash_paid,
            paid_to_cosmo_mentor: self.slots.cosmo_mentor.cash_paid,
        }
    }

    /// Check stored counters against the log.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Corrupt`] if they disagree
    pub fn verify_counters(&self, stored: &ReferralCounters) -> Result<()> {
        let expected = self.expected_counters();
        if &expected != stored {
            return Err(LedgerError::Corrupt(format!(
                "stored counters {stored:?} disagree with ledger {expected:?}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ujb_types::ledger::{AdjustmentDeduction, Recipient};

    fn payment(id: &str, received: Amount, commission: Amount, d: (Amount, Amount, Amount)) -> LedgerEntry {
        LedgerEntry::Payment(Payment {
            payment_id: id.to_string(),
            referral_id: "r1".to_string(),
            amount_received: received,
            payment_date: 0,
            payment_from: "Ravi".to_string(),
            commission,
            distribution: Distribution {
                orbiter: d.0,
                orbiter_mentor: d.1,
                cosmo_mentor: d.2,
            },
        })
    }

    fn payout(id: &str, payment_id: &str, slot: Slot, logical: Amount, deducted: Option<Amount>) -> LedgerEntry {
        LedgerEntry::Payout(Payout {
            payout_id: id.to_string(),
            referral_id: "r1".to_string(),
            belongs_to_payment_id: payment_id.to_string(),
            slot,
            recipient: Recipient {
                name: "Asha".to_string(),
                key: None,
            },
            logical_amount: logical,
            adjustment: deducted.map(|deducted| AdjustmentDeduction { deducted }),
            tds_amount: 0,
            mode_of_payment: "NEFT".to_string(),
            transaction_ref: "UTR".to_string(),
            payment_date: 0,
        })
    }

    #[test]
    fn test_empty_log() {
        let log: Vec<LedgerEntry> = Vec::new();
        let state = LedgerState::fold(&log).expect("fold");
        assert_eq!(state, LedgerState::default());
        assert_eq!(state.remaining_for("p1", Slot::Orbiter), None);
    }

    #[test]
    fn test_earned_paid_remaining() {
        let log = vec![
            payment("p1", 60_000, 6_500, (2_600, 650, 650)),
            payout("o1", "p1", Slot::Orbiter, 1_000, None),
        ];
        let state = LedgerState::fold(&log).expect("fold");
        assert_eq!(state.slots.orbiter.earned, 2_600);
        assert_eq!(state.slots.orbiter.paid, 1_000);
        assert_eq!(state.remaining_for("p1", Slot::Orbiter), Some(1_600));
        assert_eq!(state.remaining_for("p1", Slot::CosmoMentor), Some(650));
        assert_eq!(state.retained, 56_100);
    }

    #[test]
    fn test_remaining_is_scoped_per_payment() {
        let log = vec![
            payment("p1", 10_000, 1_000, (400, 100, 100)),
            payment("p2", 10_000, 1_000, (400, 100, 100)),
            payout("o1", "p1", Slot::Orbiter, 400, None),
        ];
        let state = LedgerState::fold(&log).expect("fold");
        assert_eq!(state.remaining_for("p1", Slot::Orbiter), Some(0));
        assert_eq!(state.remaining_for("p2", Slot::Orbiter), Some(400));
        assert_eq!(state.slots.orbiter.remaining(), 400);
    }

    #[test]
    fn test_adjusted_payout_credits_full_logical_amount() {
        let log = vec![
            payment("p1", 60_000, 6_500, (2_600, 650, 650)),
            payout("o1", "p1", Slot::Orbiter, 1_500, Some(1_000)),
        ];
        let state = LedgerState::fold(&log).expect("fold");
        assert_eq!(state.slots.orbiter.paid, 1_500);
        assert_eq!(state.slots.orbiter.cash_paid, 500);
        assert_eq!(state.slots.orbiter.deducted, 1_000);
        assert_eq!(state.expected_counters().paid_to_orbiter, 500);
    }

    #[test]
    fn test_overdrawn_log_is_corrupt() {
        let log = vec![
            payment("p1", 60_000, 6_500, (2_600, 650, 650)),
            payout("o1", "p1", Slot::Orbiter, 2_600, None),
            payout("o2", "p1", Slot::Orbiter, 1, None),
        ];
        assert!(matches!(LedgerState::fold(&log), Err(LedgerError::Corrupt(_))));
    }

    #[test]
    fn test_payout_before_its_payment_is_corrupt() {
        let log = vec![
            payout("o1", "p1", Slot::Orbiter, 1, None),
            payment("p1", 60_000, 6_500, (2_600, 650, 650)),
        ];
        assert!(matches!(LedgerState::fold(&log), Err(LedgerError::Corrupt(_))));
    }

    #[test]
    fn test_over_distributed_payment_is_corrupt() {
        let log = vec![payment("p1", 100, 100, (90, 20, 0))];
        assert!(matches!(LedgerState::fold(&log), Err(LedgerError::Corrupt(_))));
    }

    #[test]
    fn test_conservation_and_non_negative_remaining() {
        let mut log = Vec::new();
        for i in 0..20u64 {
            let received = 1_000 + i * 137;
            let commission = received / 10;
            let d = (commission * 4 / 10, commission / 10, commission / 10);
            log.push(payment(&format!("p{i}"), received, commission, d));
            if i % 3 == 0 {
                log.push(payout(&format!("o{i}"), &format!("p{i}"), Slot::Orbiter, d.0 / 2, None));
            }
        }
        let state = LedgerState::fold(&log).expect("fold");
        let distributed = state.slots.orbiter.earned
            + state.slots.orbiter_mentor.earned
            + state.slots.cosmo_mentor.earned;
        assert!(distributed <= state.amount_received);
        for p in &state.payments {
            for slot in Slot::ALL {
                let totals = p.slots.get(slot);
                assert!(totals.paid <= totals.earned);
            }
        }
    }

    #[test]
    fn test_verify_counters() {
        let log = vec![
            payment("p1", 60_000, 6_500, (2_600, 650, 650)),
            payout("o1", "p1", Slot::OrbiterMentor, 650, None),
        ];
        let state = LedgerState::fold(&log).expect("fold");
        let good = ReferralCounters {
            cosmo_paid: 60_000,
            ujb_balance: 56_100,
            paid_to_orbiter: 0,
            paid_to_orbiter_mentor: 650,
            paid_to_cosmo_mentor: 0,
        };
        state.verify_counters(&good).expect("consistent");
        let bad = ReferralCounters {
            cosmo_paid: 1,
            ..good
        };
        assert!(state.verify_counters(&bad).is_err());
    }
}
