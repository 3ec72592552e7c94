//! # Inbound Ports (Driving Ports / API)
//!
//! The interface the protocol engine drives. The boundary functions return
//! a [`StatusCode`]; the frame operations return typed results.

use crate::domain::entities::{
    ExtendedAddress, IncomingFrame, KeyId, OutgoingFrame, UnsecuredFrame,
};
use crate::domain::errors::{SecurityError, StatusCode};
use zb_crypto::Digest;

/// Zigbee link-layer security API.
///
/// All methods are synchronous and never block.
pub trait ZigbeeSecurityApi {
    // =========================================================================
    // BOUNDARY FUNCTIONS
    // =========================================================================

    /// AES-MMO hash of `data`.
    fn aes_mmo_hash(&self, data: &[u8]) -> Digest;

    /// Install a 16-byte trust center link key for `peer`.
    ///
    /// `InvalidParameter` unless `key` is exactly 16 bytes.
    fn add_device_link_key_by_key(&mut self, peer: ExtendedAddress, key: &[u8]) -> StatusCode;

    /// Derive and install the link key for `peer` from its install code.
    ///
    /// `InvalidParameter` for a bad length or CRC.
    fn add_device_link_key_by_install_code(
        &mut self,
        peer: ExtendedAddress,
        install_code: &[u8],
    ) -> StatusCode;

    /// Validate an OTA image signature.
    ///
    /// `InvalidParameter` for wrong lengths, `NotSupported` for an unknown
    /// suite, `SecurityFail` if the signature does not verify.
    #[allow(clippy::too_many_arguments)]
    fn ecdsa_validate(
        &self,
        suite: u8,
        ca_public_key: &[u8],
        certificate: &[u8],
        signature: &[u8],
        image_digest: &[u8],
        cert_digest: &[u8],
    ) -> StatusCode;

    // =========================================================================
    // FRAME OPERATIONS
    // =========================================================================

    /// Secure a frame; returns `header || aux header || body || MIC`.
    fn secure_outgoing(&mut self, frame: OutgoingFrame) -> Result<Vec<u8>, SecurityError>;

    /// Verify and decrypt a received frame.
    fn unsecure_incoming(&mut self, frame: &IncomingFrame) -> Result<UnsecuredFrame, SecurityError>;

    /// Allow the next frame from `peer` under `key_id` to restart its counter.
    fn authorize_counter_reset(&mut self, peer: ExtendedAddress, key_id: KeyId) -> bool;

    /// Forget every key and counter of a device that left.
    fn remove_device(&mut self, peer: ExtendedAddress) -> usize;
}
