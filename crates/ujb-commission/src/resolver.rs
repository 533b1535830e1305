//! Per-payment commission resolution.
//!
//! A payment of `increment` arriving when the deal has already received
//! `value_before` carries
//!
//! ```text
//! min(C(value_before + increment) − commission_before, increment)
//! ```
//!
//! where `commission_before` is the commission already charged on earlier
//! payments. Subtracting what was actually charged (rather than
//! `C(value_before)`) makes a fixed-amount commission apply once per referral,
//! and lets any part of it that did not fit into an earlier payment carry
//! forward. The cap keeps the commission within the money actually received.

use serde::{Deserialize, Serialize};
use ujb_types::commission::{CommissionConfig, CommissionTerms};
use ujb_types::ledger::Distribution;
use ujb_types::Amount;

use crate::schedule::{cumulative, slab_cumulative};
use crate::{slabs, split, CommissionError, Result};

/// Deal position at the moment a payment is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveInput {
    /// Deal value received before this payment.
    pub value_before: Amount,
    /// This payment's amount.
    pub increment: Amount,
    /// Commission already charged on this referral.
    pub commission_before: Amount,
}

/// Part of a payment falling within one slab.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabPortion {
    /// Slab position; always 0 for flat configs.
    pub slab_index: usize,
    pub portion: Amount,
    /// Scheduled commission within the slab, before the per-payment cap.
    pub commission: Amount,
}

/// Outcome of resolving one payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Commission carried by this payment.
    pub commission: Amount,
    /// Breakdown of the increment across slabs.
    pub portions: Vec<SlabPortion>,
    /// Stakeholder shares of `commission`.
    pub distribution: Distribution,
}

impl Resolution {
    /// Platform's share of a payment of `increment`.
    pub fn retained(&self, increment: Amount) -> Amount {
        increment.saturating_sub(self.distribution.total().unwrap_or(Amount::MAX))
    }
}

/// Validate a referral's commission terms before any payment touches them.
pub fn validate_terms(terms: &CommissionTerms) -> Result<()> {
    slabs::validate_config(&terms.config)?;
    split::validate_split(&terms.split)
}

/// Resolve the commission and stakeholder distribution for one payment.
///
/// # Errors
///
/// - Any configuration error from [`validate_terms`]
/// - [`CommissionError::ZeroIncrement`] if the payment amount is zero
/// - [`CommissionError::Overflow`] on arithmetic overflow
pub fn resolve(terms: &CommissionTerms, input: ResolveInput) -> Result<Resolution> {
    validate_terms(terms)?;

    if input.increment == 0 {
        return Err(CommissionError::ZeroIncrement);
    }

    let value_after = input
        .value_before
        .checked_add(input.increment)
        .ok_or(CommissionError::Overflow)?;

    let owed = cumulative(&terms.config, value_after)?;
    let commission = owed
        .saturating_sub(input.commission_before)
        .min(input.increment);

    let portions = portions(&terms.config, input.value_before, value_after)?;
    let distribution = split::allocate(commission, &terms.split)?;

    tracing::debug!(
        value_before = input.value_before,
        increment = input.increment,
        owed,
        commission,
        "commission resolved"
    );

    Ok(Resolution {
        commission,
        portions,
        distribution,
    })
}

/// Apportion `[before, after)` across the slabs it spans.
fn portions(config: &CommissionConfig, before: Amount, after: Amount) -> Result<Vec<SlabPortion>> {
    match config {
        CommissionConfig::Flat { .. } => Ok(vec![SlabPortion {
            slab_index: 0,
            portion: after - before,
            commission: cumulative(config, after)?.saturating_sub(cumulative(config, before)?),
        }]),
        CommissionConfig::Slabbed { slabs } => {
            let mut out = Vec::new();
            for (slab_index, slab) in slabs.iter().enumerate() {
                let lo = before.max(slab.from);
                let hi = after.min(slab.to.unwrap_or(Amount::MAX));
                if hi <= lo {
                    continue;
                }
                let commission =
                    slab_cumulative(slab, after)?.saturating_sub(slab_cumulative(slab, before)?);
                out.push(SlabPortion {
                    slab_index,
                    portion: hi - lo,
                    commission,
                });
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ujb_types::commission::{RateKind, Slab, StakeholderSplit};

    fn two_tier(split: StakeholderSplit) -> CommissionTerms {
        CommissionTerms {
            config: CommissionConfig::Slabbed {
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
            },
            split,
        }
    }

    fn split_40_10_10() -> StakeholderSplit {
        StakeholderSplit {
            orbiter_bps: 4_000,
            orbiter_mentor_bps: 1_000,
            cosmo_mentor_bps: 1_000,
        }
    }

    fn input(value_before: Amount, increment: Amount, commission_before: Amount) -> ResolveInput {
        ResolveInput {
            value_before,
            increment,
            commission_before,
        }
    }

    #[test]
    fn test_single_payment_spanning_slabs() {
        let terms = two_tier(split_40_10_10());
        let r = resolve(&terms, input(0, 80_000, 0)).expect("resolve");
        assert_eq!(r.commission, 9_500);
        assert_eq!(
            r.portions,
            vec![
                SlabPortion {
                    slab_index: 0,
                    portion: 50_000,
                    commission: 5_000
                },
                SlabPortion {
                    slab_index: 1,
                    portion: 30_000,
                    commission: 4_500
                },
            ]
        );
    }

    #[test]
    fn test_payment_60000_distribution() {
        let terms = two_tier(split_40_10_10());
        let r = resolve(&terms, input(0, 60_000, 0)).expect("resolve");
        assert_eq!(r.commission, 6_500);
        assert_eq!(r.distribution.orbiter, 2_600);
        assert_eq!(r.distribution.orbiter_mentor, 650);
        assert_eq!(r.distribution.cosmo_mentor, 650);
        assert_eq!(r.retained(60_000), 56_100);
    }

    #[test]
    fn test_split_payments_match_single_payment() {
        let terms = two_tier(split_40_10_10());
        let first = resolve(&terms, input(0, 30_000, 0)).expect("first");
        let second = resolve(&terms, input(30_000, 50_000, first.commission)).expect("second");
        assert_eq!(first.commission + second.commission, 9_500);
        assert_eq!(second.portions.len(), 2);
        assert_eq!(second.portions[0].portion, 20_000);
        assert_eq!(second.portions[1].portion, 30_000);
    }

    #[test]
    fn test_flat_amount_applied_once() {
        let terms = CommissionTerms {
            config: CommissionConfig::Flat {
                kind: RateKind::Amount,
                value: 1_000,
            },
            split: split_40_10_10(),
        };
        let mut value = 0;
        let mut charged = 0;
        for _ in 0..3 {
            let r = resolve(&terms, input(value, 5_000, charged)).expect("resolve");
            value += 5_000;
            charged += r.commission;
        }
        assert_eq!(charged, 1_000);
    }

    #[test]
    fn test_flat_amount_larger_than_first_payment_carries_forward() {
        let terms = CommissionTerms {
            config: CommissionConfig::Flat {
                kind: RateKind::Amount,
                value: 1_000,
            },
            split: StakeholderSplit::default(),
        };
        let first = resolve(&terms, input(0, 600, 0)).expect("first");
        assert_eq!(first.commission, 600);
        let second = resolve(&terms, input(600, 600, 600)).expect("second");
        assert_eq!(second.commission, 400);
    }

    #[test]
    fn test_flat_percentage() {
        let terms = CommissionTerms {
            config: CommissionConfig::Flat {
                kind: RateKind::Percentage,
                value: 2_000,
            },
            split: split_40_10_10(),
        };
        let r = resolve(&terms, input(10_000, 5_000, 2_000)).expect("resolve");
        assert_eq!(r.commission, 1_000);
        assert_eq!(r.distribution.orbiter, 400);
    }

    #[test]
    fn test_zero_increment_rejected() {
        let terms = two_tier(split_40_10_10());
        assert_eq!(
            resolve(&terms, input(0, 0, 0)),
            Err(CommissionError::ZeroIncrement)
        );
    }

    #[test]
    fn test_malformed_table_rejected_before_resolution() {
        let mut terms = two_tier(split_40_10_10());
        if let CommissionConfig::Slabbed { slabs } = &mut terms.config {
            slabs[1].from = 55_000;
        }
        assert!(matches!(
            resolve(&terms, input(0, 10_000, 0)),
            Err(CommissionError::SlabGap { .. })
        ));
    }

    #[test]
    fn test_distribution_conserves_money() {
        let terms = two_tier(StakeholderSplit {
            orbiter_bps: 5_000,
            orbiter_mentor_bps: 2_500,
            cosmo_mentor_bps: 2_500,
        });
        let mut value = 0;
        let mut charged = 0;
        for increment in [1, 333, 49_999, 7, 12_345, 100_000] {
            let r = resolve(&terms, input(value, increment, charged)).expect("resolve");
            assert!(r.distribution.total().expect("total") <= r.commission);
            assert!(r.commission <= increment);
            value += increment;
            charged += r.commission;
        }
    }
}
