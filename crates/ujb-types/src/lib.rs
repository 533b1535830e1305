//! # ujb-types
//!
//! Shared domain types for the UJustBe referral settlement ledger.
//!
//! Money is carried as [`Amount`] in minor currency units (paise). Rates and
//! split fractions are basis points out of [`BPS_DENOMINATOR`].

pub mod commission;
pub mod events;
pub mod ledger;
pub mod referral;

/// Money in minor currency units (1 rupee = 100 paise).
pub type Amount = u64;

/// Rate or share expressed in basis points (10_000 = 100%).
pub type BasisPoints = u32;

pub type ReferralId = String;
pub type PaymentId = String;
pub type PayoutId = String;

/// Recipient identity used to key standing adjustments (a member's UJB code).
pub type RecipientKey = String;

/// Minor units per rupee.
pub const MINOR_UNITS_PER_RUPEE: u64 = 100;

/// Denominator for all basis-point quantities.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Label used when a slot has no member on file and the platform absorbs the share.
pub const PLATFORM_LABEL: &str = "UJustBe";

/// Convert whole rupees to minor units.
pub const fn rupees(value: u64) -> Amount {
    value * MINOR_UNITS_PER_RUPEE
}

/// Convert a whole percentage to basis points.
pub const fn percent(value: u32) -> BasisPoints {
    value * 100
}

/// Error parsing a persisted or wire-level enum name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
