//! Ledger events pushed to subscribers after each committed write.

use serde::{Deserialize, Serialize};

/// Envelope for all daemon events.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: u64,
    #[ts(type = "unknown")]
    pub payload: serde_json::Value,
}

/// All event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Ledger events
    PaymentRecorded,
    PayoutRecorded,
    AdjustmentRegistered,
    AdjustmentConsumed,

    // Referral events
    ReferralUpserted,
    DealStatusChanged,

    // System events
    DaemonStarted,
}

impl EventType {
    /// Subscription category for filtering.
    pub fn category(&self) -> &'static str {
        match self {
            EventType::PaymentRecorded
            | EventType::PayoutRecorded
            | EventType::AdjustmentRegistered
            | EventType::AdjustmentConsumed => "ledger",
            EventType::ReferralUpserted | EventType::DealStatusChanged => "referral",
            EventType::DaemonStarted => "system",
        }
    }
}
