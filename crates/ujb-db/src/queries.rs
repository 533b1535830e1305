//! Database query functions organized by domain.

pub mod adjustments;
pub mod entries;
pub mod referrals;
