//! # Adapters Layer
//!
//! Implementations of the outbound [`SecurityEventSink`](crate::ports::outbound::SecurityEventSink) port:
//! - `channel`: in-memory broadcast to any number of subscribers
//! - `telemetry`: Prometheus counters and structured log lines
//! - `noop`: discards everything

pub mod channel;
pub mod noop;
pub mod telemetry;

pub use channel::BroadcastEventSink;
pub use noop::NoopEventSink;
pub use telemetry::TelemetryEventSink;
