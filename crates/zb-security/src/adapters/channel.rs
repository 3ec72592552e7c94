//! # Broadcast Event Adapter
//!
//! Fans security events out over `tokio::sync::broadcast`. Publishing is a
//! non-blocking send, so the service can call it from any context; slow
//! subscribers lag and lose the oldest events instead of stalling frames.

use crate::ports::outbound::{SecurityEvent, SecurityEventSink};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// In-memory multi-subscriber event sink.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<SecurityEvent>,
    events_published: AtomicU64,
    capacity: usize,
}

impl BroadcastEventSink {
    /// Create a sink with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a sink buffering `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SecurityEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events published, including those nobody received.
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Per-subscriber buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityEventSink for BroadcastEventSink {
    fn publish(&self, event: SecurityEvent) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        // No subscribers is not an error
        if let Ok(receivers) = self.sender.send(event) {
            trace!(receivers, "security event delivered");
        }
    }
}
