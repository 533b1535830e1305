//! Validation of commission structures.
//!
//! A slab table must partition `[0, ∞)` (or a prefix of it ending at the last
//! slab's `to`) into contiguous, non-overlapping, increasing ranges. Only the
//! final slab may be unbounded.

use ujb_types::commission::{CommissionConfig, RateKind, Slab};
use ujb_types::BPS_DENOMINATOR;

use crate::{CommissionError, Result};

/// Validate a single rate.
///
/// # Errors
///
/// - [`CommissionError::RateOutOfRange`] if a percentage exceeds 100%
pub fn validate_rate(kind: RateKind, value: u64) -> Result<()> {
    if kind == RateKind::Percentage && value > BPS_DENOMINATOR {
        return Err(CommissionError::RateOutOfRange { value });
    }
    Ok(())
}

/// Validate a slab table.
///
/// # Errors
///
/// - [`CommissionError::EmptySlabs`] if the table is empty
/// - [`CommissionError::FirstSlabNotAtZero`] if coverage does not start at 0
/// - [`CommissionError::InvertedSlab`] if any `to <= from`
/// - [`CommissionError::UnboundedSlabNotLast`] if an open slab is followed by another
/// - [`CommissionError::SlabGap`] / [`CommissionError::SlabOverlap`] on discontinuity
/// - [`CommissionError::RateOutOfRange`] on an invalid percentage
pub fn validate_slabs(slabs: &[Slab]) -> Result<()> {
    let first = slabs.first().ok_or(CommissionError::EmptySlabs)?;
    if first.from != 0 {
        return Err(CommissionError::FirstSlabNotAtZero { from: first.from });
    }

    let last_index = slabs.len() - 1;
    let mut expected_from = 0;

    for (index, slab) in slabs.iter().enumerate() {
        validate_rate(slab.kind, slab.value)?;

        if slab.from > expected_from {
            return Err(CommissionError::SlabGap {
                index,
                expected: expected_from,
                found: slab.from,
            });
        }
        if slab.from < expected_from {
            return Err(CommissionError::SlabOverlap {
                index,
                expected: expected_from,
                found: slab.from,
            });
        }

        match slab.to {
            Some(to) if to <= slab.from => {
                return Err(CommissionError::InvertedSlab {
                    index,
                    from: slab.from,
                    to,
                });
            }
            Some(to) => expected_from = to,
            None if index != last_index => {
                return Err(CommissionError::UnboundedSlabNotLast { index });
            }
            None => {}
        }
    }

    Ok(())
}

/// Validate any commission structure.
pub fn validate_config(config: &CommissionConfig) -> Result<()> {
    match config {
        CommissionConfig::Flat { kind, value } => validate_rate(*kind, *value),
        CommissionConfig::Slabbed { slabs } => validate_slabs(slabs),
    }
}
