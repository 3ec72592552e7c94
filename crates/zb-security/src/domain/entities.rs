//! # Core Entities
//!
//! Addresses, security levels, key identifiers and the frame types that flow
//! through the security service.

use crate::domain::errors::SecurityError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IEEE 802.15.4 extended (64-bit) address.
pub type ExtendedAddress = u64;

/// Upper bound (exclusive) for an authorized frame counter reset.
pub const FRAME_COUNTER_RESET_MAX: u32 = 256;

/// Frame counter value that marks a key as exhausted.
pub const MAX_FRAME_COUNTER: u32 = u32::MAX;

/// The well-known preconfigured global trust center link key.
pub const ZIGBEE_ALLIANCE_09: [u8; 16] = *b"ZigBeeAlliance09";

// =============================================================================
// ADDRESSES
// =============================================================================

/// Addressing mode carried next to raw address bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AddressMode {
    /// No address present
    None = 0x00,
    /// 16-bit network address
    Short = 0x02,
    /// 64-bit IEEE address
    Extended = 0x03,
}

impl TryFrom<u8> for AddressMode {
    type Error = SecurityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::None),
            0x02 => Ok(Self::Short),
            0x03 => Ok(Self::Extended),
            other => Err(SecurityError::MalformedInput(format!(
                "unknown address mode 0x{other:02X}"
            ))),
        }
    }
}

/// A short or extended address; never interpreted without its mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    /// 16-bit network address
    Short(u16),
    /// 64-bit IEEE address
    Extended(ExtendedAddress),
}

impl Address {
    /// Decode little-endian address bytes according to `mode`.
    ///
    /// Returns `Ok(None)` for [`AddressMode::None`].
    pub fn from_mode(mode: AddressMode, bytes: &[u8]) -> Result<Option<Self>, SecurityError> {
        match mode {
            AddressMode::None => Ok(None),
            AddressMode::Short => {
                let raw: [u8; 2] = bytes.try_into().map_err(|_| {
                    SecurityError::MalformedInput(format!(
                        "short address needs 2 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                Ok(Some(Self::Short(u16::from_le_bytes(raw))))
            }
            AddressMode::Extended => {
                let raw: [u8; 8] = bytes.try_into().map_err(|_| {
                    SecurityError::MalformedInput(format!(
                        "extended address needs 8 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                Ok(Some(Self::Extended(u64::from_le_bytes(raw))))
            }
        }
    }

    /// Addressing mode of this address.
    pub fn mode(&self) -> AddressMode {
        match self {
            Self::Short(_) => AddressMode::Short,
            Self::Extended(_) => AddressMode::Extended,
        }
    }

    /// Little-endian on-air bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Short(a) => a.to_le_bytes().to_vec(),
            Self::Extended(a) => a.to_le_bytes().to_vec(),
        }
    }

    /// The extended address, if this is one.
    pub fn extended(&self) -> Option<ExtendedAddress> {
        match self {
            Self::Extended(a) => Some(*a),
            Self::Short(_) => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short(a) => write!(f, "0x{a:04X}"),
            Self::Extended(a) => write!(f, "{a:016X}"),
        }
    }
}

// =============================================================================
// SECURITY LEVEL
// =============================================================================

/// Security level (bits 0-2 of the security control octet).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SecurityLevel {
    /// No security
    None = 0,
    /// MIC-32
    Mic32 = 1,
    /// MIC-64
    Mic64 = 2,
    /// MIC-128
    Mic128 = 3,
    /// Encryption only
    Enc = 4,
    /// Encryption + MIC-32 (Zigbee PRO network level)
    EncMic32 = 5,
    /// Encryption + MIC-64
    EncMic64 = 6,
    /// Encryption + MIC-128
    EncMic128 = 7,
}

impl SecurityLevel {
    /// Level from the low three bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::None,
            1 => Self::Mic32,
            2 => Self::Mic64,
            3 => Self::Mic128,
            4 => Self::Enc,
            5 => Self::EncMic32,
            6 => Self::EncMic64,
            _ => Self::EncMic128,
        }
    }

    /// Numeric value 0-7.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// MIC length in bytes: 0, 4, 8 or 16.
    pub fn mic_length(self) -> usize {
        let bits = self.as_u8() & 0x03;
        (2usize << bits) & !0x03
    }

    /// Whether the payload is encrypted.
    pub fn is_encrypted(self) -> bool {
        self.as_u8() & 0x04 != 0
    }

    /// True if this level encrypts whenever `required` does and carries a
    /// MIC at least as long. A level without a MIC never qualifies.
    pub fn protects_as(self, required: SecurityLevel) -> bool {
        self.mic_length() > 0
            && self.mic_length() >= required.mic_length()
            && (self.is_encrypted() || !required.is_encrypted())
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = SecurityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 7 {
            return Err(SecurityError::MalformedInput(format!(
                "security level {value} out of range"
            )));
        }
        Ok(Self::from_bits(value))
    }
}

// =============================================================================
// KEY IDENTIFIERS AND TYPES
// =============================================================================

/// Key identifier (bits 3-4 of the security control octet plus two
/// local-only markers).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyId {
    /// Data key (link key)
    Link = 0x00,
    /// Network key
    Network = 0x01,
    /// Key-transport key
    Transport = 0x02,
    /// Key-load key
    KeyLoad = 0x03,
    /// Send the frame twice, once per key; never on air
    BothLinkAndNetwork = 0xFE,
    /// Use the stack default; never on air
    Default = 0xFF,
}

impl KeyId {
    /// Key id from the two on-air bits.
    pub fn from_wire_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Link,
            1 => Self::Network,
            2 => Self::Transport,
            _ => Self::KeyLoad,
        }
    }

    /// Whether this identifier can appear in an auxiliary header.
    pub fn is_on_air(self) -> bool {
        (self as u8) <= 0x03
    }

    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Network => "network",
            Self::Transport => "transport",
            Self::KeyLoad => "key_load",
            Self::BothLinkAndNetwork => "both",
            Self::Default => "default",
        }
    }
}

impl TryFrom<u8> for KeyId {
    type Error = SecurityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00..=0x03 => Ok(Self::from_wire_bits(value)),
            0xFE => Ok(Self::BothLinkAndNetwork),
            0xFF => Ok(Self::Default),
            other => Err(SecurityError::MalformedInput(format!(
                "unknown key id 0x{other:02X}"
            ))),
        }
    }
}

/// Class of key held by the key store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyType {
    /// Standard network key
    StandardNetwork = 0x01,
    /// Application link key shared with one peer
    ApplicationLink = 0x03,
    /// Trust center link key
    TrustCenterLink = 0x04,
    /// Zigbee Direct global ephemeral authorization key
    GlobalEphemeralAuth = 0xB0,
    /// Zigbee Direct unique ephemeral authorization key
    UniqueEphemeralAuth = 0xB1,
    /// Zigbee Direct basic authorization key
    BasicAuth = 0xB2,
    /// Zigbee Direct administrative authorization key
    AdminAuth = 0xB3,
}

impl KeyType {
    /// True for the Zigbee Direct authorization key classes.
    pub fn is_direct_authorization(self) -> bool {
        matches!(
            self,
            Self::GlobalEphemeralAuth
                | Self::UniqueEphemeralAuth
                | Self::BasicAuth
                | Self::AdminAuth
        )
    }

    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            Self::StandardNetwork => "network",
            Self::ApplicationLink => "app_link",
            Self::TrustCenterLink => "tc_link",
            Self::GlobalEphemeralAuth => "global_ephemeral_auth",
            Self::UniqueEphemeralAuth => "unique_ephemeral_auth",
            Self::BasicAuth => "basic_auth",
            Self::AdminAuth => "admin_auth",
        }
    }
}

impl TryFrom<u8> for KeyType {
    type Error = SecurityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::StandardNetwork),
            0x03 => Ok(Self::ApplicationLink),
            0x04 => Ok(Self::TrustCenterLink),
            0xB0 => Ok(Self::GlobalEphemeralAuth),
            0xB1 => Ok(Self::UniqueEphemeralAuth),
            0xB2 => Ok(Self::BasicAuth),
            0xB3 => Ok(Self::AdminAuth),
            other => Err(SecurityError::MalformedInput(format!(
                "unknown key type 0x{other:02X}"
            ))),
        }
    }
}

/// Which key secured an accepted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EncryptType {
    /// Frame was not secured
    None = 0x00,
    /// Active network key
    StandardNetwork = 0x01,
    /// Application link key
    ApplicationLink = 0x83,
    /// Unique trust center link key
    TrustCenterLink = 0x84,
    /// Preconfigured global trust center link key
    GlobalTrustCenterLink = 0x90,
    /// Distributed-security global link key
    DistributedTrustCenterLink = 0xA0,
}

impl EncryptType {
    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::StandardNetwork => "network",
            Self::ApplicationLink => "app_link",
            Self::TrustCenterLink => "tc_link",
            Self::GlobalTrustCenterLink => "global_tc_link",
            Self::DistributedTrustCenterLink => "distributed_tc_link",
        }
    }
}

// =============================================================================
// FRAME COUNTER
// =============================================================================

/// Outgoing frame counter of one key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCounter(u32);

impl FrameCounter {
    /// Counter starting at `value`.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Value the next frame will carry.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// True once no further frame may be sent under this key.
    pub fn is_exhausted(&self) -> bool {
        self.0 == MAX_FRAME_COUNTER
    }

    /// Take the current value for an outgoing frame and advance.
    ///
    /// # Errors
    ///
    /// `SecurityError::CounterExhausted` once the counter holds
    /// `0xFFFFFFFF`; the counter never wraps.
    pub fn next_outgoing(&mut self) -> Result<u32, SecurityError> {
        if self.is_exhausted() {
            return Err(SecurityError::CounterExhausted);
        }
        let current = self.0;
        self.0 += 1;
        Ok(current)
    }
}

// =============================================================================
// FRAMES
// =============================================================================

/// A cleartext frame handed to the security service for transmission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingFrame {
    /// Unsecured frame header, authenticated but never encrypted
    pub header: Vec<u8>,
    /// Payload to protect
    pub payload: Vec<u8>,
    /// Key to secure with
    pub key_id: KeyId,
    /// Extended address of this device (nonce source)
    pub source: ExtendedAddress,
    /// Peer for link-key lookup
    pub destination: Option<ExtendedAddress>,
    /// Level override; the configured network level when `None`
    pub level: Option<SecurityLevel>,
    /// Carry the source address in the auxiliary header
    pub extended_nonce: bool,
}

impl OutgoingFrame {
    /// Network-key frame with the source address in the auxiliary header.
    pub fn network(header: Vec<u8>, payload: Vec<u8>, source: ExtendedAddress) -> Self {
        Self {
            header,
            payload,
            key_id: KeyId::Network,
            source,
            destination: None,
            level: None,
            extended_nonce: true,
        }
    }

    /// Link-key frame addressed to `destination`.
    pub fn link(
        header: Vec<u8>,
        payload: Vec<u8>,
        source: ExtendedAddress,
        destination: ExtendedAddress,
    ) -> Self {
        Self {
            header,
            payload,
            key_id: KeyId::Link,
            source,
            destination: Some(destination),
            level: None,
            extended_nonce: true,
        }
    }

    /// Select a different key identifier.
    pub fn with_key_id(mut self, key_id: KeyId) -> Self {
        self.key_id = key_id;
        self
    }

    /// Override the security level.
    pub fn with_level(mut self, level: SecurityLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Set whether the source address travels in the auxiliary header.
    pub fn with_extended_nonce(mut self, extended_nonce: bool) -> Self {
        self.extended_nonce = extended_nonce;
        self
    }
}

/// A received secured frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingFrame {
    /// Header, auxiliary header, secured payload and MIC
    pub data: Vec<u8>,
    /// Length of the unsecured header preceding the auxiliary header
    pub header_len: usize,
    /// Sender extended address when the auxiliary header omits it
    pub source: Option<ExtendedAddress>,
}

impl IncomingFrame {
    /// Frame whose auxiliary header starts at `header_len`.
    pub fn new(data: Vec<u8>, header_len: usize) -> Self {
        Self {
            data,
            header_len,
            source: None,
        }
    }

    /// Supply the sender address resolved by the network layer.
    pub fn with_source(mut self, source: ExtendedAddress) -> Self {
        self.source = Some(source);
        self
    }
}

/// Result of a successful unsecure operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsecuredFrame {
    /// Unsecured header as received
    pub header: Vec<u8>,
    /// Decrypted payload
    pub payload: Vec<u8>,
    /// Sender extended address
    pub source: ExtendedAddress,
    /// Key identifier from the auxiliary header
    pub key_id: KeyId,
    /// Accepted frame counter
    pub frame_counter: u32,
    /// Level used for verification
    pub level: SecurityLevel,
    /// Network key sequence number, for network-key frames
    pub key_sequence: Option<u8>,
    /// Which key matched
    pub encrypt_type: EncryptType,
}
