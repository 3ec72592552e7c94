//! CCM* nonce construction.

use crate::domain::entities::ExtendedAddress;
use zb_crypto::NONCE_SIZE;

/// 13-byte CCM* nonce.
pub type Nonce = [u8; NONCE_SIZE];

/// `source (8, LE) || frame counter (4, LE) || security control (1)`.
pub fn build_nonce(source: ExtendedAddress, frame_counter: u32, security_control: u8) -> Nonce {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..8].copy_from_slice(&source.to_le_bytes());
    nonce[8..12].copy_from_slice(&frame_counter.to_le_bytes());
    nonce[12] = security_control;
    nonce
}
