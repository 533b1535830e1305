//! Commission configuration attached to a Cosmo's product or service.

use serde::{Deserialize, Serialize};

use crate::{Amount, BasisPoints};

/// How a flat config or a slab charges commission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    /// `value` is in basis points of the commissionable value.
    Percentage,
    /// `value` is a fixed amount in minor units.
    Amount,
}

/// One tier of a slabbed commission table, covering `[from, to)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Slab {
    pub from: Amount,
    /// `None` means unbounded (last slab only).
    pub to: Option<Amount>,
    pub kind: RateKind,
    pub value: u64,
}

impl Slab {
    /// Width of the slab, or `None` when unbounded.
    pub fn width(&self) -> Option<Amount> {
        self.to.map(|to| to.saturating_sub(self.from))
    }
}

/// Commission structure: a single flat rate or a progressive slab table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CommissionConfig {
    Flat { kind: RateKind, value: u64 },
    Slabbed { slabs: Vec<Slab> },
}

/// Shares of the resolved commission passed down to each stakeholder slot.
///
/// Shares need not sum to 100%; the unallocated part stays with the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct StakeholderSplit {
    pub orbiter_bps: BasisPoints,
    pub orbiter_mentor_bps: BasisPoints,
    pub cosmo_mentor_bps: BasisPoints,
}

impl StakeholderSplit {
    pub fn total_bps(&self) -> u64 {
        u64::from(self.orbiter_bps)
            + u64::from(self.orbiter_mentor_bps)
            + u64::from(self.cosmo_mentor_bps)
    }
}

/// Everything the resolver needs for a referral: the structure and the split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CommissionTerms {
    pub config: CommissionConfig,
    pub split: StakeholderSplit,
}
