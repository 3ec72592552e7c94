//! # CCM* Frame Transform
//!
//! Binds a security level to [`CcmStar`]: the level fixes the MIC length
//! and whether the payload is encrypted. With encryption off the payload
//! passes through unchanged and is authenticated along with the header.

use crate::domain::entities::SecurityLevel;
use crate::domain::errors::SecurityError;
use crate::domain::nonce::Nonce;
use zb_crypto::{CcmStar, CryptoError, Mic, SecretKey};

/// Secure `payload`, returning the (possibly encrypted) body and the MIC.
///
/// # Errors
///
/// `MalformedInput` if the header or payload exceeds the CCM* length limits.
pub fn encrypt(
    level: SecurityLevel,
    key: &SecretKey,
    nonce: &Nonce,
    header: &[u8],
    payload: &[u8],
) -> Result<(Vec<u8>, Mic), SecurityError> {
    let ccm = CcmStar::new(key, level.mic_length()).map_err(SecurityError::from)?;
    Ok(ccm.seal(nonce, header, payload, level.is_encrypted())?)
}

/// Verify `mic` and recover the payload.
///
/// # Errors
///
/// `AuthFailure` if the MIC does not verify or has the wrong length for
/// `level`; no plaintext is returned in that case.
pub fn decrypt(
    level: SecurityLevel,
    key: &SecretKey,
    nonce: &Nonce,
    header: &[u8],
    body: &[u8],
    mic: &[u8],
) -> Result<Vec<u8>, SecurityError> {
    if mic.len() != level.mic_length() {
        return Err(SecurityError::AuthFailure);
    }
    let ccm = CcmStar::new(key, level.mic_length())?;
    ccm.open(nonce, header, body, mic, level.is_encrypted())
        .map_err(|e| match e {
            CryptoError::AuthenticationFailed => SecurityError::AuthFailure,
            other => SecurityError::from(other),
        })
}
