//! Event emission.
//!
//! Ledger commits are pushed to subscribed connections as JSON-RPC
//! notifications. Each subscriber has an independent buffer; a subscriber
//! that falls behind by more than the buffer skips the lost events and
//! can re-pull with `get_ledger_entries`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use ujb_types::events::{Event, EventType};

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "ledger", "referral", "system".
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    /// Filter to specific referrals.
    #[serde(default)]
    pub referral_ids: Option<Vec<String>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }

    /// Emit an event stamped with the current time.
    pub fn publish(&self, event_type: EventType, payload: serde_json::Value) {
        self.emit(Event {
            event_type,
            timestamp: crate::commands::now(),
            payload,
        });
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref categories) = self.categories {
            let category = event.event_type.category();
            if !categories.iter().any(|c| c == category) {
                return false;
            }
        }

        // Events without a referral_id (system events) pass the referral filter
        if let Some(ref referral_ids) = self.referral_ids {
            if let Some(rid) = event.payload.get("referral_id").and_then(|v| v.as_str()) {
                if !referral_ids.iter().any(|id| id == rid) {
                    return false;
                }
            }
        }

        true
    }
}
