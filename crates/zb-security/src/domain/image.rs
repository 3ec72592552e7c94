//! # OTA Image Signature Validation
//!
//! An upgrade image is signed with the signer's certificate-bound ECDSA key.
//! The signature field is `signer IEEE (8, LE) || r || s`.
//!
//! | Suite | Curve | CA key | Certificate | Signature |
//! |-------|-------|--------|-------------|-----------|
//! | 1 | sect163k1 | 22 | 48 | 50 |
//! | 2 | sect283k1 | 37 | 74 | 80 |
//!
//! Lengths are checked before any cryptography runs.

use crate::domain::cbke::{Cbke2Certificate, CbkeCertificate, ImplicitCertificate};
use crate::domain::entities::ExtendedAddress;
use crate::domain::errors::SecurityError;
use serde::{Deserialize, Serialize};
use zb_crypto::ecc::Point;
use zb_crypto::{EcdsaSignature, EcdsaVerifier, Sect163k1, Sect283k1, ZigbeeCurve, DIGEST_SIZE};

/// Signer address prefix of the signature field.
pub const SIGNER_LEN: usize = 8;

/// ECDSA signature suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EcdsaSignatureSuite {
    /// sect163k1, 48-byte certificates
    Suite1 = 1,
    /// sect283k1, 74-byte certificates
    Suite2 = 2,
}

impl EcdsaSignatureSuite {
    /// Compressed CA public key length.
    pub fn ca_public_key_len(self) -> usize {
        match self {
            Self::Suite1 => Sect163k1::POINT_BYTES,
            Self::Suite2 => Sect283k1::POINT_BYTES,
        }
    }

    /// Certificate length.
    pub fn certificate_len(self) -> usize {
        match self {
            Self::Suite1 => CbkeCertificate::SIZE,
            Self::Suite2 => Cbke2Certificate::SIZE,
        }
    }

    /// Signature field length.
    pub fn signature_len(self) -> usize {
        let scalar = match self {
            Self::Suite1 => Sect163k1::SCALAR_BYTES,
            Self::Suite2 => Sect283k1::SCALAR_BYTES,
        };
        SIGNER_LEN + 2 * scalar
    }

    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Suite1 => "suite1",
            Self::Suite2 => "suite2",
        }
    }
}

impl TryFrom<u8> for EcdsaSignatureSuite {
    type Error = SecurityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Suite1),
            2 => Ok(Self::Suite2),
            other => Err(SecurityError::UnsupportedSuite(other)),
        }
    }
}

fn check_len(what: &str, actual: usize, expected: usize) -> Result<(), SecurityError> {
    if actual != expected {
        return Err(SecurityError::MalformedInput(format!(
            "{what} must be {expected} bytes, got {actual}"
        )));
    }
    Ok(())
}

/// Validate an image signature; returns the signer address.
///
/// # Errors
///
/// `MalformedInput` for any length mismatch, `CertificateInvalid` if the CA
/// key or the signer key cannot be decoded or reconstructed,
/// `SignatureInvalid` if the signer is not the certificate subject or the
/// signature does not verify.
pub fn validate(
    suite: EcdsaSignatureSuite,
    ca_public_key: &[u8],
    certificate: &[u8],
    signature: &[u8],
    image_digest: &[u8],
    cert_digest: &[u8],
) -> Result<ExtendedAddress, SecurityError> {
    check_len("CA public key", ca_public_key.len(), suite.ca_public_key_len())?;
    check_len("certificate", certificate.len(), suite.certificate_len())?;
    check_len("signature", signature.len(), suite.signature_len())?;
    check_len("image digest", image_digest.len(), DIGEST_SIZE)?;
    check_len("certificate digest", cert_digest.len(), DIGEST_SIZE)?;

    match suite {
        EcdsaSignatureSuite::Suite1 => validate_with::<CbkeCertificate>(
            ca_public_key,
            certificate,
            signature,
            image_digest,
            cert_digest,
        ),
        EcdsaSignatureSuite::Suite2 => validate_with::<Cbke2Certificate>(
            ca_public_key,
            certificate,
            signature,
            image_digest,
            cert_digest,
        ),
    }
}

fn validate_with<T: ImplicitCertificate>(
    ca_public_key: &[u8],
    certificate: &[u8],
    signature: &[u8],
    image_digest: &[u8],
    cert_digest: &[u8],
) -> Result<ExtendedAddress, SecurityError> {
    let ca_public = Point::<T::Curve>::from_compressed(ca_public_key)
        .map_err(|e| SecurityError::CertificateInvalid(format!("CA public key: {e}")))?;
    let certificate = T::parse(certificate)?;

    let (signer, rs) = signature.split_at(SIGNER_LEN);
    let mut signer_bytes = [0u8; SIGNER_LEN];
    signer_bytes.copy_from_slice(signer);
    let signer = u64::from_le_bytes(signer_bytes);
    if signer != certificate.subject() {
        return Err(SecurityError::SignatureInvalid);
    }

    let public_key = certificate.public_key_with_digest(&ca_public, cert_digest)?;
    let verifier = EcdsaVerifier::new(public_key)
        .map_err(|e| SecurityError::CertificateInvalid(format!("signer key: {e}")))?;
    let signature =
        EcdsaSignature::<T::Curve>::from_bytes(rs).map_err(|_| SecurityError::SignatureInvalid)?;

    verifier
        .verify(image_digest, &signature)
        .map_err(|_| SecurityError::SignatureInvalid)?;
    Ok(signer)
}
