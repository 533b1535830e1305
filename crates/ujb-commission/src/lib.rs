//! # ujb-commission
//!
//! Commission resolution for referral payments.
//!
//! Given a referral's [`CommissionTerms`](ujb_types::commission::CommissionTerms)
//! and the deal value already received, works out how much commission the next
//! payment carries and how it splits across the Orbiter, Orbiter-mentor and
//! Cosmo-mentor slots. Whatever is not allocated stays with the platform.
//!
//! ## Modules
//!
//! - [`slabs`]: Validation of flat rates and slab tables
//! - [`schedule`]: Cumulative commission schedule `C(v)`
//! - [`split`]: Stakeholder split of a resolved commission
//! - [`resolver`]: Per-payment resolution

pub mod resolver;
pub mod schedule;
pub mod slabs;
pub mod split;

pub use resolver::{resolve, validate_terms, ResolveInput, Resolution, SlabPortion};

use ujb_types::Amount;

/// Error types for commission resolution.
///
/// Every variant except [`CommissionError::ZeroIncrement`] and
/// [`CommissionError::Overflow`] is a configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommissionError {
    /// Slab table has no entries.
    #[error("slab table is empty")]
    EmptySlabs,

    /// The first slab must start at zero.
    #[error("first slab must start at 0, starts at {from}")]
    FirstSlabNotAtZero {
        /// Lower bound of the first slab.
        from: Amount,
    },

    /// A slab's upper bound is not above its lower bound.
    #[error("slab {index} has non-increasing bounds {from}..{to}")]
    InvertedSlab {
        /// Position in the table.
        index: usize,
        from: Amount,
        to: Amount,
    },

    /// An unbounded slab appears before the end of the table.
    #[error("slab {index} is unbounded but is not the last slab")]
    UnboundedSlabNotLast {
        /// Position in the table.
        index: usize,
    },

    /// A slab starts after the previous one ends.
    #[error("gap before slab {index}: expected start {expected}, found {found}")]
    SlabGap {
        index: usize,
        expected: Amount,
        found: Amount,
    },

    /// A slab starts before the previous one ends.
    #[error("slab {index} overlaps previous slab: expected start {expected}, found {found}")]
    SlabOverlap {
        index: usize,
        expected: Amount,
        found: Amount,
    },

    /// A percentage rate above 100%.
    #[error("percentage rate {value} bps exceeds 10000")]
    RateOutOfRange {
        /// The offending rate in basis points.
        value: u64,
    },

    /// Stakeholder shares allocate more than the whole commission.
    #[error("stakeholder split allocates {total} bps, more than 10000")]
    SplitExceedsCommission {
        /// Sum of the three shares.
        total: u64,
    },

    /// Payment increment is zero.
    #[error("commissionable increment is zero")]
    ZeroIncrement,

    /// Arithmetic overflow.
    #[error("arithmetic overflow in commission calculation")]
    Overflow,
}

/// Convenience result type for commission operations.
pub type Result<T> = std::result::Result<T, CommissionError>;

/// `amount * bps / 10_000`, rounded down.
pub(crate) fn apply_bps(amount: Amount, bps: u64) -> Result<Amount> {
    let scaled = u128::from(amount)
        .checked_mul(u128::from(bps))
        .ok_or(CommissionError::Overflow)?
        / u128::from(ujb_types::BPS_DENOMINATOR);
    Amount::try_from(scaled).map_err(|_| CommissionError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_bps_floors() {
        assert_eq!(apply_bps(10_000, 1_500).expect("apply"), 1_500);
        assert_eq!(apply_bps(333, 1_000).expect("apply"), 33);
        assert_eq!(apply_bps(0, 1_000).expect("apply"), 0);
    }

    #[test]
    fn test_apply_bps_overflow() {
        assert_eq!(
            apply_bps(u64::MAX, u64::MAX),
            Err(CommissionError::Overflow)
        );
    }
}
