//! Stakeholder split of a resolved commission.
//!
//! Each slot receives `commission × share / 10_000`, rounded down. Unlike a
//! full revenue split the shares need not reach 100%: the unallocated part
//! and all rounding dust stay with the platform, so the distribution can never
//! exceed the commission it was cut from.

use ujb_types::commission::StakeholderSplit;
use ujb_types::ledger::Distribution;
use ujb_types::{Amount, BPS_DENOMINATOR};

use crate::{apply_bps, CommissionError, Result};

/// Validate a stakeholder split.
///
/// # Errors
///
/// - [`CommissionError::SplitExceedsCommission`] if the shares sum past 100%
pub fn validate_split(split: &StakeholderSplit) -> Result<()> {
    let total = split.total_bps();
    if total > BPS_DENOMINATOR {
        return Err(CommissionError::SplitExceedsCommission { total });
    }
    Ok(())
}

/// Allocate a commission across the three slots.
///
/// # Errors
///
/// - [`CommissionError::SplitExceedsCommission`] if the split is invalid
/// - [`CommissionError::Overflow`] on arithmetic overflow
pub fn allocate(commission: Amount, split: &StakeholderSplit) -> Result<Distribution> {
    validate_split(split)?;

    Ok(Distribution {
        orbiter: apply_bps(commission, u64::from(split.orbiter_bps))?,
        orbiter_mentor: apply_bps(commission, u64::from(split.orbiter_mentor_bps))?,
        cosmo_mentor: apply_bps(commission, u64::from(split.cosmo_mentor_bps))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(orbiter: u32, orbiter_mentor: u32, cosmo_mentor: u32) -> StakeholderSplit {
        StakeholderSplit {
            orbiter_bps: orbiter,
            orbiter_mentor_bps: orbiter_mentor,
            cosmo_mentor_bps: cosmo_mentor,
        }
    }

    #[test]
    fn test_allocate_40_10_10() {
        let d = allocate(650_000, &split(4_000, 1_000, 1_000)).expect("allocate");
        assert_eq!(d.orbiter, 260_000);
        assert_eq!(d.orbiter_mentor, 65_000);
        assert_eq!(d.cosmo_mentor, 65_000);
    }

    #[test]
    fn test_allocate_never_exceeds_commission() {
        let s = split(3_334, 3_333, 3_333);
        for commission in [1, 2, 3, 7, 99, 10_001, 123_457] {
            let d = allocate(commission, &s).expect("allocate");
            assert!(d.total().expect("total") <= commission);
        }
    }

    #[test]
    fn test_zero_split_allocates_nothing() {
        let d = allocate(5_000, &StakeholderSplit::default()).expect("allocate");
        assert_eq!(d, Distribution::default());
    }

    #[test]
    fn test_split_over_100_rejected() {
        assert_eq!(
            validate_split(&split(6_000, 3_000, 2_000)),
            Err(CommissionError::SplitExceedsCommission { total: 11_000 })
        );
    }
}
