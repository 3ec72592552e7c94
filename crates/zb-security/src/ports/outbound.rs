//! # Outbound Ports (Driven Ports / SPI)
//!
//! Security outcomes are published as a closed set of events to a sink
//! supplied by the host.

use crate::domain::entities::{EncryptType, ExtendedAddress, KeyId, KeyType};
use crate::domain::errors::SecurityError;
use crate::domain::image::EcdsaSignatureSuite;

/// Credential class named in a rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Raw link key
    LinkKey,
    /// Install code
    InstallCode,
    /// CBKE certificate
    Certificate,
    /// OTA image signature
    Signature,
}

impl CredentialKind {
    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            Self::LinkKey => "link_key",
            Self::InstallCode => "install_code",
            Self::Certificate => "certificate",
            Self::Signature => "signature",
        }
    }
}

/// Key agreement scheme of a completed key establishment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAgreementScheme {
    /// Static cofactor Diffie-Hellman
    Ecdh,
    /// Menezes-Qu-Vanstone with ephemeral keys
    Ecmqv,
}

impl KeyAgreementScheme {
    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ecdh => "ecdh",
            Self::Ecmqv => "ecmqv",
        }
    }
}

/// Everything the security service reports to its host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecurityEvent {
    /// An outgoing frame was secured
    FrameSecured {
        /// Link-key peer, if any
        destination: Option<ExtendedAddress>,
        /// Key identifier used
        key_id: KeyId,
        /// Counter carried by the frame
        frame_counter: u32,
    },
    /// An incoming frame verified
    FrameAccepted {
        /// Sender
        source: ExtendedAddress,
        /// Key identifier from the auxiliary header
        key_id: KeyId,
        /// Accepted counter
        frame_counter: u32,
        /// Which key matched
        encrypt_type: EncryptType,
    },
    /// An incoming frame was dropped
    FrameRejected {
        /// Sender, when it could be determined
        source: Option<ExtendedAddress>,
        /// Why
        error: SecurityError,
    },
    /// A key was installed or replaced
    KeyInstalled {
        /// Key class
        key_type: KeyType,
        /// Bound peer
        peer: Option<ExtendedAddress>,
    },
    /// Keys and counters of a device were dropped
    DeviceRemoved {
        /// Device address
        device: ExtendedAddress,
        /// Number of keys removed
        keys_removed: usize,
    },
    /// The active network key changed
    NetworkKeySwitched {
        /// New key sequence number
        sequence: u8,
    },
    /// A frame counter reset was authorized
    CounterResetAuthorized {
        /// Peer
        peer: ExtendedAddress,
        /// Key identifier
        key_id: KeyId,
    },
    /// An install code, key, certificate or signature was rejected
    CredentialRejected {
        /// Credential class
        kind: CredentialKind,
        /// Why
        error: SecurityError,
    },
    /// An upgrade image signature verified
    ImageValidated {
        /// Signature suite
        suite: EcdsaSignatureSuite,
        /// Signer address
        signer: ExtendedAddress,
    },
    /// A CBKE shared secret was derived
    KeyEstablished {
        /// `cbke1` or `cbke2`
        suite: &'static str,
        /// ECDH or ECMQV
        scheme: KeyAgreementScheme,
        /// Certificate subject of the peer
        peer: ExtendedAddress,
    },
}

/// Receiver of security events.
///
/// `publish` must not block; the service calls it inline.
pub trait SecurityEventSink: Send + Sync {
    /// Deliver one event.
    fn publish(&self, event: SecurityEvent);
}

impl<T: SecurityEventSink + ?Sized> SecurityEventSink for std::sync::Arc<T> {
    fn publish(&self, event: SecurityEvent) {
        (**self).publish(event)
    }
}
