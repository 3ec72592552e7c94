//! # Security Header Codec
//!
//! Security control octet and auxiliary security header.
//!
//! ```text
//!  control (1) | frame counter (4, LE) | source ext addr (8, LE)? | key seq (1)?
//!
//!  control:  b7 b6 |   b5    | b4 b3  | b2 b1 b0
//!            rsvd  | ext non | key id |  level
//! ```
//!
//! The source address is present iff the extended-nonce bit is set; the
//! key sequence number is present iff the key id is `Network`.

use crate::domain::entities::{ExtendedAddress, KeyId, SecurityLevel};
use crate::domain::errors::SecurityError;

/// Smallest auxiliary header: control octet and frame counter.
pub const MIN_AUX_HEADER_LEN: usize = 5;

/// Largest auxiliary header.
pub const MAX_AUX_HEADER_LEN: usize = 14;

const LEVEL_MASK: u8 = 0x07;
const KEY_ID_SHIFT: u8 = 3;
const KEY_ID_MASK: u8 = 0x18;
const EXTENDED_NONCE: u8 = 0x20;
const RESERVED_MASK: u8 = 0xC0;

/// Unpacked security control octet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecurityControl {
    /// Security level
    pub level: SecurityLevel,
    /// Key identifier
    pub key_id: KeyId,
    /// Source address carried in the auxiliary header
    pub extended_nonce: bool,
}

impl SecurityControl {
    /// Build a control value.
    pub fn new(level: SecurityLevel, key_id: KeyId, extended_nonce: bool) -> Self {
        Self {
            level,
            key_id,
            extended_nonce,
        }
    }

    /// Pack into the on-air octet (reserved bits zero).
    ///
    /// # Errors
    ///
    /// `MalformedHeader` for `BothLinkAndNetwork` or `Default`, which have
    /// no on-air encoding.
    pub fn pack(&self) -> Result<u8, SecurityError> {
        if !self.key_id.is_on_air() {
            return Err(SecurityError::MalformedHeader(format!(
                "key id {:?} cannot be sent on air",
                self.key_id
            )));
        }
        let mut byte = self.level.as_u8() | ((self.key_id as u8) << KEY_ID_SHIFT);
        if self.extended_nonce {
            byte |= EXTENDED_NONCE;
        }
        Ok(byte)
    }

    /// Unpack an on-air octet.
    ///
    /// # Errors
    ///
    /// `MalformedHeader` if `strict` and either reserved bit is set.
    pub fn unpack(byte: u8, strict: bool) -> Result<Self, SecurityError> {
        if strict && byte & RESERVED_MASK != 0 {
            return Err(SecurityError::MalformedHeader(format!(
                "reserved bits set in control octet 0x{byte:02X}"
            )));
        }
        Ok(Self {
            level: SecurityLevel::from_bits(byte & LEVEL_MASK),
            key_id: KeyId::from_wire_bits((byte & KEY_ID_MASK) >> KEY_ID_SHIFT),
            extended_nonce: byte & EXTENDED_NONCE != 0,
        })
    }
}

/// Replace the level bits of a packed control octet.
pub fn with_level(control: u8, level: SecurityLevel) -> u8 {
    (control & !LEVEL_MASK) | level.as_u8()
}

/// Auxiliary security header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuxHeader {
    /// Control octet
    pub control: SecurityControl,
    /// Frame counter
    pub frame_counter: u32,
    /// Source address, present iff `control.extended_nonce`
    pub source: Option<ExtendedAddress>,
    /// Key sequence number, present iff `control.key_id == Network`
    pub key_sequence: Option<u8>,
}

impl AuxHeader {
    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        MIN_AUX_HEADER_LEN
            + if self.control.extended_nonce { 8 } else { 0 }
            + if self.control.key_id == KeyId::Network { 1 } else { 0 }
    }

    /// Encode to wire bytes.
    ///
    /// # Errors
    ///
    /// `MalformedHeader` if the optional fields disagree with the control
    /// octet or the key id has no on-air encoding.
    pub fn encode(&self) -> Result<Vec<u8>, SecurityError> {
        let control = self.control.pack()?;
        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(control);
        out.extend_from_slice(&self.frame_counter.to_le_bytes());

        match (self.control.extended_nonce, self.source) {
            (true, Some(source)) => out.extend_from_slice(&source.to_le_bytes()),
            (false, None) => {}
            _ => {
                return Err(SecurityError::MalformedHeader(
                    "source address must be present iff extended nonce is set".to_string(),
                ))
            }
        }

        match (self.control.key_id == KeyId::Network, self.key_sequence) {
            (true, Some(seq)) => out.push(seq),
            (false, None) => {}
            _ => {
                return Err(SecurityError::MalformedHeader(
                    "key sequence number must be present iff key id is network".to_string(),
                ))
            }
        }

        Ok(out)
    }

    /// Decode from the start of `bytes`, returning the header and its length.
    ///
    /// # Errors
    ///
    /// `MalformedHeader` for truncated input or (when `strict`) reserved
    /// control bits.
    pub fn decode(bytes: &[u8], strict: bool) -> Result<(Self, usize), SecurityError> {
        let (&control, rest) = bytes.split_first().ok_or_else(|| {
            SecurityError::MalformedHeader("empty auxiliary header".to_string())
        })?;
        let control = SecurityControl::unpack(control, strict)?;
        let header = Self {
            control,
            frame_counter: 0,
            source: None,
            key_sequence: None,
        };
        let len = header.encoded_len();
        if bytes.len() < len {
            return Err(SecurityError::MalformedHeader(format!(
                "auxiliary header needs {len} bytes, got {}",
                bytes.len()
            )));
        }

        let mut counter = [0u8; 4];
        counter.copy_from_slice(&rest[..4]);
        let mut offset = MIN_AUX_HEADER_LEN;

        let source = if control.extended_nonce {
            let mut addr = [0u8; 8];
            addr.copy_from_slice(&bytes[offset..offset + 8]);
            offset += 8;
            Some(u64::from_le_bytes(addr))
        } else {
            None
        };

        let key_sequence = (control.key_id == KeyId::Network).then(|| bytes[offset]);

        Ok((
            Self {
                control,
                frame_counter: u32::from_le_bytes(counter),
                source,
                key_sequence,
            },
            len,
        ))
    }
}
