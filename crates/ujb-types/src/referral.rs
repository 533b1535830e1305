//! Referral record as seen by the ledger.
//!
//! The record is owned by the referral-management screens; the ledger only
//! reads the deal terms and writes back the derived counters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::commission::CommissionTerms;
use crate::{Amount, RecipientKey, ReferralId, UnknownVariant};

/// A member participating in a referral.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Party {
    pub name: String,
    /// UJB membership code; keys standing adjustments.
    pub ujb_code: Option<RecipientKey>,
}

/// Deal progress states recorded in a referral's status history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Pending,
    Rejected,
    NotConnected,
    CalledButNotAnswered,
    DiscussionInProgress,
    Hold,
    DealLost,
    DealWon,
    WorkInProgress,
    WorkCompleted,
    ReceivedPartPayment,
    ReceivedFullPayment,
    AgreedPercentageTransferred,
}

impl DealStatus {
    pub const ALL: &'static [DealStatus] = &[
        DealStatus::Pending,
        DealStatus::Rejected,
        DealStatus::NotConnected,
        DealStatus::CalledButNotAnswered,
        DealStatus::DiscussionInProgress,
        DealStatus::Hold,
        DealStatus::DealLost,
        DealStatus::DealWon,
        DealStatus::WorkInProgress,
        DealStatus::WorkCompleted,
        DealStatus::ReceivedPartPayment,
        DealStatus::ReceivedFullPayment,
        DealStatus::AgreedPercentageTransferred,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::Rejected => "rejected",
            DealStatus::NotConnected => "not_connected",
            DealStatus::CalledButNotAnswered => "called_but_not_answered",
            DealStatus::DiscussionInProgress => "discussion_in_progress",
            DealStatus::Hold => "hold",
            DealStatus::DealLost => "deal_lost",
            DealStatus::DealWon => "deal_won",
            DealStatus::WorkInProgress => "work_in_progress",
            DealStatus::WorkCompleted => "work_completed",
            DealStatus::ReceivedPartPayment => "received_part_payment",
            DealStatus::ReceivedFullPayment => "received_full_payment",
            DealStatus::AgreedPercentageTransferred => "agreed_percentage_transferred",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DealStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "deal status",
                value: s.to_string(),
            })
    }
}

/// Counters the ledger maintains on the referral record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ReferralCounters {
    /// Total received from the Cosmo so far.
    pub cosmo_paid: Amount,
    /// Platform's retained share of everything received.
    pub ujb_balance: Amount,
    /// Cash actually sent to each slot.
    pub paid_to_orbiter: Amount,
    pub paid_to_orbiter_mentor: Amount,
    pub paid_to_cosmo_mentor: Amount,
}

/// A referral deal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Referral {
    pub referral_id: ReferralId,
    pub orbiter: Party,
    pub cosmo: Party,
    pub orbiter_mentor: Option<Party>,
    pub cosmo_mentor: Option<Party>,
    /// `None` when the product or service carries no commission config.
    pub commission: Option<CommissionTerms>,
    /// Negotiated total deal value; `None` until agreed.
    pub agreed_amount: Option<Amount>,
    pub status_history: Vec<DealStatus>,
    pub counters: ReferralCounters,
    /// Bumped on every ledger append.
    pub revision: u64,
}

impl Referral {
    /// Whether the deal was marked won at any point in its history.
    pub fn deal_ever_won(&self) -> bool {
        self.status_history.contains(&DealStatus::DealWon)
    }

    pub fn current_status(&self) -> Option<DealStatus> {
        self.status_history.last().copied()
    }

    /// Part of the agreed deal value not yet received.
    pub fn agreed_remaining(&self) -> Amount {
        self.agreed_amount
            .unwrap_or(0)
            .saturating_sub(self.counters.cosmo_paid)
    }
}
