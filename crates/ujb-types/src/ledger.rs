//! Ledger entries: inbound client payments and outbound stakeholder payouts.
//!
//! Both kinds are immutable once appended. A referral's ledger is the ordered
//! sequence of [`SequencedEntry`] values sharing its `referral_id`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Amount, PaymentId, PayoutId, RecipientKey, ReferralId, UnknownVariant};

/// One of the three downstream payout recipients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub enum Slot {
    Orbiter,
    OrbiterMentor,
    CosmoMentor,
}

impl Slot {
    /// All slots in stable order.
    pub const ALL: [Slot; 3] = [Slot::Orbiter, Slot::OrbiterMentor, Slot::CosmoMentor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Orbiter => "Orbiter",
            Slot::OrbiterMentor => "OrbiterMentor",
            Slot::CosmoMentor => "CosmoMentor",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::ALL
            .iter()
            .copied()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "slot",
                value: s.to_string(),
            })
    }
}

/// Per-slot commission amounts fixed when a payment is recorded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Distribution {
    pub orbiter: Amount,
    pub orbiter_mentor: Amount,
    pub cosmo_mentor: Amount,
}

impl Distribution {
    pub fn get(&self, slot: Slot) -> Amount {
        match slot {
            Slot::Orbiter => self.orbiter,
            Slot::OrbiterMentor => self.orbiter_mentor,
            Slot::CosmoMentor => self.cosmo_mentor,
        }
    }

    /// Sum across slots; `None` on overflow.
    pub fn total(&self) -> Option<Amount> {
        self.orbiter
            .checked_add(self.orbiter_mentor)?
            .checked_add(self.cosmo_mentor)
    }
}

/// Money received from the Cosmo toward a referral.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub referral_id: ReferralId,
    pub amount_received: Amount,
    /// Unix timestamp (seconds).
    pub payment_date: u64,
    pub payment_from: String,
    /// Total commission resolved for this payment.
    pub commission: Amount,
    pub distribution: Distribution,
}

impl Payment {
    /// Platform's share of this payment.
    pub fn retained(&self) -> Amount {
        self.amount_received
            .saturating_sub(self.distribution.total().unwrap_or(Amount::MAX))
    }
}

/// Who a payout was sent to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Recipient {
    pub name: String,
    /// `None` for the platform sentinel or members without a code.
    pub key: Option<RecipientKey>,
}

/// Portion of a payout's cash withheld against a standing adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct AdjustmentDeduction {
    pub deducted: Amount,
}

/// Money sent from the platform to one slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Payout {
    pub payout_id: PayoutId,
    pub referral_id: ReferralId,
    pub belongs_to_payment_id: PaymentId,
    pub slot: Slot,
    pub recipient: Recipient,
    /// Entitlement settled, credited against the slot regardless of cash moved.
    pub logical_amount: Amount,
    pub adjustment: Option<AdjustmentDeduction>,
    /// Carried for audit display only.
    pub tds_amount: Amount,
    pub mode_of_payment: String,
    pub transaction_ref: String,
    /// Unix timestamp (seconds).
    pub payment_date: u64,
}

impl Payout {
    pub fn deducted(&self) -> Amount {
        self.adjustment.map(|a| a.deducted).unwrap_or(0)
    }

    /// Cash that actually left the platform.
    pub fn cash_amount(&self) -> Amount {
        self.logical_amount.saturating_sub(self.deducted())
    }
}

/// A ledger entry, discriminated explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEntry {
    Payment(Payment),
    Payout(Payout),
}

impl LedgerEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            LedgerEntry::Payment(_) => EntryKind::Payment,
            LedgerEntry::Payout(_) => EntryKind::Payout,
        }
    }

    pub fn referral_id(&self) -> &str {
        match self {
            LedgerEntry::Payment(p) => &p.referral_id,
            LedgerEntry::Payout(p) => &p.referral_id,
        }
    }
}

/// Persisted discriminant for [`LedgerEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Payment,
    Payout,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Payment => "payment",
            EntryKind::Payout => "payout",
        }
    }
}

impl FromStr for EntryKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(EntryKind::Payment),
            "payout" => Ok(EntryKind::Payout),
            other => Err(UnknownVariant {
                kind: "entry kind",
                value: other.to_string(),
            }),
        }
    }
}

/// An entry with its position in the referral's append order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct SequencedEntry {
    pub seq: u64,
    pub entry: LedgerEntry,
}
