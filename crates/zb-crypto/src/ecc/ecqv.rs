//! Elliptic Curve Qu-Vanstone implicit certificates.
//!
//! An implicit certificate carries a reconstruction point `P` instead of a
//! public key and a CA signature. Anyone holding the CA public key recovers
//! the subject's key as `Q = e * P + Q_CA`, where `e` is the certificate
//! hash. Only the subject can hold the matching private key, so a forged
//! certificate simply yields a key nobody can use.

use super::curve::{Point, ZigbeeCurve};
use super::scalar::{PrivateKey, Scalar};
use crate::CryptoError;

/// Certificate hash as a scalar: the digest read as a big-endian integer,
/// reduced mod n.
///
/// # Errors
///
/// Returns `CryptoError::InvalidInput` for digests over 64 bytes.
pub fn certificate_scalar<C: ZigbeeCurve>(cert_digest: &[u8]) -> Result<Scalar<C>, CryptoError> {
    Scalar::from_bytes_reduced(cert_digest)
}

/// Recover the subject public key `Q = e * P + Q_CA`.
///
/// # Errors
///
/// Returns `CryptoError::PointAtInfinity` if the reconstruction lands on
/// the identity.
pub fn reconstruct_public_key<C: ZigbeeCurve>(
    reconstruction: &Point<C>,
    cert_digest: &[u8],
    ca_public: &Point<C>,
) -> Result<Point<C>, CryptoError> {
    let e = certificate_scalar::<C>(cert_digest)?;
    let q = reconstruction.mul(&e).add(ca_public);
    if q.is_infinity() {
        return Err(CryptoError::PointAtInfinity);
    }
    Ok(q)
}

/// Reconstruction point `P = R_U + k * G` the CA embeds in the certificate.
///
/// `R_U` is the requester's ephemeral public key, `k` the CA's per-issue
/// ephemeral private key.
pub fn reconstruction_point<C: ZigbeeCurve>(
    request: &Point<C>,
    ca_ephemeral: &PrivateKey<C>,
) -> Point<C> {
    request.add(&ca_ephemeral.public_key())
}

/// CA private-key contribution `r = e * k + d_CA mod n`.
pub fn private_key_contribution<C: ZigbeeCurve>(
    e: &Scalar<C>,
    ca_ephemeral: &PrivateKey<C>,
    ca_private: &PrivateKey<C>,
) -> Scalar<C> {
    e.mul(ca_ephemeral.scalar()).add(ca_private.scalar())
}

/// Subject private key `d_U = e * k_U + r mod n`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPrivateKey` if the result is zero.
pub fn reconstruct_private_key<C: ZigbeeCurve>(
    e: &Scalar<C>,
    request_private: &PrivateKey<C>,
    contribution: &Scalar<C>,
) -> Result<PrivateKey<C>, CryptoError> {
    PrivateKey::from_scalar(e.mul(request_private.scalar()).add(contribution))
}
