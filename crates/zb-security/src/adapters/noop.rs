//! Event sink that drops every event.

use crate::ports::outbound::{SecurityEvent, SecurityEventSink};

/// Discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEventSink;

impl SecurityEventSink for NoopEventSink {
    fn publish(&self, _event: SecurityEvent) {}
}
