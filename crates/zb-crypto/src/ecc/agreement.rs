//! Key agreement: cofactor Diffie-Hellman and MQV.
//!
//! Both schemes output the x coordinate of the agreed point, big-endian,
//! one field element wide (21 bytes on sect163k1, 36 on sect283k1).

use super::curve::{Point, ZigbeeCurve};
use super::scalar::{field_bytes, PrivateKey, Scalar};
use crate::CryptoError;
use primitive_types::U512;
use std::fmt;
use zeroize::Zeroize;

/// Shared secret `Z`, zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if empty (never for a derived secret).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret({} bytes)", self.0.len())
    }
}

fn secret_from_point<C: ZigbeeCurve>(point: &Point<C>) -> Result<SharedSecret, CryptoError> {
    let x = point.x().ok_or(CryptoError::PointAtInfinity)?;
    let bytes = x.to_bytes();
    debug_assert_eq!(bytes.len(), field_bytes::<C>());
    Ok(SharedSecret(bytes))
}

/// Cofactor ECDH: `Z = x(h * d * Q_peer)`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPoint` if the peer key is off the curve,
/// `CryptoError::PointAtInfinity` if the product is the identity.
pub fn ecdh<C: ZigbeeCurve>(
    private: &PrivateKey<C>,
    peer_public: &Point<C>,
) -> Result<SharedSecret, CryptoError> {
    if !peer_public.is_on_curve() {
        return Err(CryptoError::InvalidPoint);
    }
    let z = peer_public.mul(private.scalar()).mul_by_cofactor();
    secret_from_point(&z)
}

/// Associate value `Q~ = (x mod 2^f) + 2^f` with `f = ceil(log2(n) / 2)`.
pub fn associate_value<C: ZigbeeCurve>(point: &Point<C>) -> Result<Scalar<C>, CryptoError> {
    let x = point.x().ok_or(CryptoError::PointAtInfinity)?;
    let half = (Scalar::<C>::order().bits() + 1) / 2;
    let high = U512::one() << half;
    let x = U512::from_big_endian(&x.to_bytes());
    Ok(Scalar::from_u512((x & (high - U512::one())) | high))
}

/// ECMQV as used by Smart Energy key establishment.
///
/// `s = k + Q~_own * d`, `Z = x(h * s * (E_peer + Q~_peer * Q_peer))`, where
/// `d`/`Q` are static keys and `k`/`E` ephemeral keys.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPoint` if a peer key is off the curve,
/// `CryptoError::PointAtInfinity` if an intermediate point is the identity.
pub fn ecmqv<C: ZigbeeCurve>(
    static_private: &PrivateKey<C>,
    ephemeral_private: &PrivateKey<C>,
    ephemeral_public: &Point<C>,
    peer_static: &Point<C>,
    peer_ephemeral: &Point<C>,
) -> Result<SharedSecret, CryptoError> {
    if !peer_static.is_on_curve() || !peer_ephemeral.is_on_curve() {
        return Err(CryptoError::InvalidPoint);
    }

    let own_assoc = associate_value(ephemeral_public)?;
    let peer_assoc = associate_value(peer_ephemeral)?;

    let s = ephemeral_private
        .scalar()
        .add(&own_assoc.mul(static_private.scalar()));
    let t = peer_ephemeral.add(&peer_static.mul(&peer_assoc));
    let z = t.mul(&s).mul_by_cofactor();
    secret_from_point(&z)
}
