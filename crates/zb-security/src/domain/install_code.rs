//! # Install Codes
//!
//! An install code is 6, 8, 12 or 16 bytes of content followed by its
//! CRC-16/X-25, stored little-endian. The device's trust center link key is
//! the AES-MMO hash of the whole code, CRC included.

use crate::domain::errors::{InstallCodeError, SecurityError};
use crc::{Crc, CRC_16_IBM_SDLC};
use zb_crypto::{aes_mmo_hash, SecretKey};

/// CRC-16/X-25 (reflected 0x1021, init and xorout 0xFFFF).
pub const INSTALL_CODE_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Supported content lengths, CRC excluded.
pub const CONTENT_LENGTHS: [usize; 4] = [6, 8, 12, 16];

/// Trailing CRC length.
pub const CRC_LEN: usize = 2;

/// Longest install code, CRC included.
pub const MAX_INSTALL_CODE_LEN: usize = 16 + CRC_LEN;

/// CRC over install code content.
pub fn install_code_crc(content: &[u8]) -> u16 {
    INSTALL_CODE_CRC.checksum(content)
}

/// Check length and CRC.
///
/// # Errors
///
/// `UnsupportedLength` for a total length other than 8, 10, 14 or 18;
/// `CrcMismatch` if the trailing CRC is wrong.
pub fn validate(code: &[u8]) -> Result<(), InstallCodeError> {
    let content_len = code.len().wrapping_sub(CRC_LEN);
    if code.len() < CRC_LEN || !CONTENT_LENGTHS.contains(&content_len) {
        return Err(InstallCodeError::UnsupportedLength(code.len()));
    }
    let (content, crc) = code.split_at(content_len);
    let expected = install_code_crc(content);
    let actual = u16::from_le_bytes([crc[0], crc[1]]);
    if expected != actual {
        return Err(InstallCodeError::CrcMismatch { expected, actual });
    }
    Ok(())
}

/// Derive the link key for a validated install code.
///
/// # Errors
///
/// `InvalidInstallCode` as for [`validate`].
pub fn derive_link_key(code: &[u8]) -> Result<SecretKey, SecurityError> {
    validate(code)?;
    Ok(SecretKey::from_bytes(aes_mmo_hash(code)))
}

/// Append the CRC to raw content, producing a complete install code.
///
/// # Errors
///
/// `UnsupportedLength` if `content` is not 6, 8, 12 or 16 bytes.
pub fn append_crc(content: &[u8]) -> Result<Vec<u8>, InstallCodeError> {
    if !CONTENT_LENGTHS.contains(&content.len()) {
        return Err(InstallCodeError::UnsupportedLength(content.len() + CRC_LEN));
    }
    let mut code = content.to_vec();
    code.extend_from_slice(&install_code_crc(content).to_le_bytes());
    Ok(code)
}
