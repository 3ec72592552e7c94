//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API the owning protocol engine calls
//! - **Outbound (Driven)**: where security events are delivered

pub mod inbound;
pub mod outbound;
