//! # Integration Flows
//!
//! Service-level scenarios driven through the public API, with events
//! observed on a broadcast subscription.

pub mod cbke;
pub mod frames;
pub mod keys;
pub mod ota;
pub mod persistence;
pub mod telemetry;
