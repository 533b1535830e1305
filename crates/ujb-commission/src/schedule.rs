//! Cumulative commission schedule.
//!
//! `C(v)` is the total commission owed once the deal has received `v`. It is
//! non-decreasing in `v`, so the commission carried by a payment is the
//! difference `C(before + increment) − C(before)`. Floor rounding inside each
//! slab telescopes across payments: the sum over many payments equals
//! `C(total)` exactly.
//!
//! ```text
//! percentage slab: (clamp(v − from, 0, width)) × bps / 10_000
//! amount slab:     value, once v > from
//! ```

use ujb_types::commission::{CommissionConfig, RateKind, Slab};
use ujb_types::Amount;

use crate::{apply_bps, CommissionError, Result};

/// Commission accrued within one slab once the deal has received `value`.
pub fn slab_cumulative(slab: &Slab, value: Amount) -> Result<Amount> {
    let within = value.saturating_sub(slab.from);
    let within = match slab.width() {
        Some(width) => within.min(width),
        None => within,
    };

    match slab.kind {
        RateKind::Percentage => apply_bps(within, slab.value),
        RateKind::Amount if within > 0 => Ok(slab.value),
        RateKind::Amount => Ok(0),
    }
}

/// Total commission owed once the deal has received `value`.
///
/// The config is assumed valid; see [`crate::slabs::validate_config`].
pub fn cumulative(config: &CommissionConfig, value: Amount) -> Result<Amount> {
    match config {
        CommissionConfig::Flat {
            kind: RateKind::Percentage,
            value: bps,
        } => apply_bps(value, *bps),
        CommissionConfig::Flat {
            kind: RateKind::Amount,
            value: fixed,
        } => Ok(if value > 0 { *fixed } else { 0 }),
        CommissionConfig::Slabbed { slabs } => slabs.iter().try_fold(0u64, |acc, slab| {
            acc.checked_add(slab_cumulative(slab, value)?)
                .ok_or(CommissionError::Overflow)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tier() -> CommissionConfig {
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

    #[test]
    fn test_progressive_schedule() {
        let config = two_tier();
        assert_eq!(cumulative(&config, 0).expect("c"), 0);
        assert_eq!(cumulative(&config, 50_000).expect("c"), 5_000);
        assert_eq!(cumulative(&config, 80_000).expect("c"), 9_500);
    }

    #[test]
    fn test_schedule_is_monotonic() {
        let config = two_tier();
        let mut last = 0;
        for v in (0..200_000).step_by(777) {
            let c = cumulative(&config, v).expect("c");
            assert!(c >= last, "C({v}) = {c} < {last}");
            last = c;
        }
    }

    #[test]
    fn test_flat_amount_charged_once() {
        let config = CommissionConfig::Flat {
            kind: RateKind::Amount,
            value: 1_000,
        };
        assert_eq!(cumulative(&config, 0).expect("c"), 0);
        assert_eq!(cumulative(&config, 1).expect("c"), 1_000);
        assert_eq!(cumulative(&config, 1_000_000).expect("c"), 1_000);
    }

    #[test]
    fn test_amount_slab_charged_on_entry() {
        let slab = Slab {
            from: 100,
            to: Some(200),
            kind: RateKind::Amount,
            value: 50,
        };
        assert_eq!(slab_cumulative(&slab, 100).expect("c"), 0);
        assert_eq!(slab_cumulative(&slab, 101).expect("c"), 50);
        assert_eq!(slab_cumulative(&slab, 10_000).expect("c"), 50);
    }

    #[test]
    fn test_bounded_tail_stops_accruing() {
        let config = CommissionConfig::Slabbed {
            slabs: vec![Slab {
                from: 0,
                to: Some(10_000),
                kind: RateKind::Percentage,
                value: 1_000,
            }],
        };
        assert_eq!(cumulative(&config, 10_000).expect("c"), 1_000);
        assert_eq!(cumulative(&config, 50_000).expect("c"), 1_000);
    }
}
