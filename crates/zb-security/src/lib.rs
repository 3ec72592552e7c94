//! # Zigbee Link-Layer Security
//!
//! Frame protection, key management and certificate-based key
//! establishment for a Zigbee PRO stack.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Wire codecs, key store, frame counters, CBKE, image signatures
//! - **Ports Layer** (`ports/`): Inbound API trait and outbound event sink trait
//! - **Adapters Layer** (`adapters/`): Broadcast, telemetry and no-op event sinks
//! - **Service Layer** (`service.rs`): Wires domain logic to ports
//!
//! | Module | Contents |
//! |--------|----------|
//! | `domain::header` | Security control octet and auxiliary header codec |
//! | `domain::nonce` | 13-byte CCM* nonce |
//! | `domain::frame_counter` | Replay protection per peer and key |
//! | `domain::key_store` | Network, link, global and Zigbee Direct keys |
//! | `domain::transform` | CCM* bound to a security level |
//! | `domain::install_code` | Install-code CRC and link key derivation |
//! | `domain::cbke` | Implicit certificates, ECDH and ECMQV |
//! | `domain::image` | OTA image ECDSA validation |
//!
//! ## Security Notes
//!
//! - **Commit after verify**: an incoming counter is stored only once the MIC checks out
//! - **No partial output**: a failed unsecure returns no plaintext
//! - **Key hygiene**: key material is zeroized on drop and redacted in `Debug`

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::{BroadcastEventSink, NoopEventSink, TelemetryEventSink};
pub use domain::cbke::{
    Cbke2Certificate, Cbke2Private, CbkeCertificate, CbkeKeys, CbkePrivate, EphemeralKeyPair,
    ImplicitCertificate,
};
pub use domain::config::SecurityConfig;
pub use domain::entities::{
    Address, AddressMode, EncryptType, ExtendedAddress, FrameCounter, IncomingFrame, KeyId,
    KeyType, OutgoingFrame, SecurityLevel, UnsecuredFrame,
};
pub use domain::errors::{InstallCodeError, SecurityError, StatusCode};
pub use domain::frame_counter::{CounterRecord, CounterScope, FrameCounterTracker};
pub use domain::header::{AuxHeader, SecurityControl};
pub use domain::image::EcdsaSignatureSuite;
pub use domain::key_store::{GlobalLinkKind, KeyEntry, KeySlot, KeyStore, KeyStoreSnapshot};
pub use ports::inbound::ZigbeeSecurityApi;
pub use ports::outbound::{CredentialKind, KeyAgreementScheme, SecurityEvent, SecurityEventSink};
pub use service::{SecurityService, SecuritySnapshot, SharedSecurityService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
