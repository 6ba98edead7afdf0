//! Pricing-change notifications.
//!
//! After a novation that changes a contract's entitlement fingerprint the
//! manager emits a [`PricingChangeEvent`]. Delivery is fire-and-forget:
//! emitters must not block and their failures never affect contract state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{catalog::PricingVersionRef, contract::UserId, entitlements::Fingerprint};

/// Default buffer of [`BroadcastEmitter`].
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A contract now resolves to a different entitlement set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingChangeEvent {
    /// Service of the new pricing version.
    pub service: String,
    /// New pricing version label.
    pub pricing_version: String,
    /// Contract that changed.
    pub user_id: UserId,
    /// Fingerprint of the new selection.
    pub fingerprint: Fingerprint,
    /// When the novation was committed.
    pub occurred_at: DateTime<Utc>,
}

impl PricingChangeEvent {
    /// Event for `user_id` now bound to `pricing` with `fingerprint`.
    #[must_use]
    pub fn new(
        pricing: &PricingVersionRef,
        user_id: UserId,
        fingerprint: Fingerprint,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            service: pricing.service.clone(),
            pricing_version: pricing.version.clone(),
            user_id,
            fingerprint,
            occurred_at,
        }
    }
}

/// Outbound sink for pricing-change events.
pub trait EventEmitter: Send + Sync + fmt::Debug {
    /// Hands `event` to the delivery mechanism without waiting for it.
    fn emit(&self, event: PricingChangeEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
    fn emit(&self, _event: PricingChangeEvent) {}
}

/// Fans events out to in-process subscribers.
///
/// Slow subscribers lag and lose the oldest events; with no subscriber the
/// event is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastEmitter {
    sender: broadcast::Sender<PricingChangeEvent>,
}

impl BroadcastEmitter {
    /// Creates an emitter buffering up to `capacity` events per subscriber.
    ///
    /// A zero capacity is raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PricingChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventEmitter for BroadcastEmitter {
    fn emit(&self, event: PricingChangeEvent) {
        let service = event.service.clone();
        if self.sender.send(event).is_err() {
            tracing::debug!(service = %service, "No subscribers for pricing-change event");
        }
    }
}
