//! Integers modulo the group order n, and the private keys built on them.

use super::curve::{Point, ZigbeeCurve};
use super::field::{FieldElement, FieldSpec};
use crate::CryptoError;
use primitive_types::U512;
use std::fmt;
use std::marker::PhantomData;
use zeroize::Zeroize;

/// Integer in `[0, n)` for the order n of curve `C`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Scalar<C: ZigbeeCurve> {
    value: U512,
    _curve: PhantomData<C>,
}

impl<C: ZigbeeCurve> Scalar<C> {
    /// Group order n.
    pub fn order() -> U512 {
        U512::from_big_endian(C::ORDER)
    }

    /// Zero.
    pub fn zero() -> Self {
        Self::from_reduced(U512::zero())
    }

    /// One.
    pub fn one() -> Self {
        Self::from_reduced(U512::one())
    }

    fn from_reduced(value: U512) -> Self {
        Self {
            value,
            _curve: PhantomData,
        }
    }

    /// Reduce an arbitrary integer modulo n.
    pub fn from_u512(value: U512) -> Self {
        Self::from_reduced(value % Self::order())
    }

    /// Interpret up to 64 big-endian bytes as an integer and reduce mod n.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidInput` for more than 64 bytes.
    pub fn from_bytes_reduced(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() > 64 {
            return Err(CryptoError::InvalidInput(format!(
                "{} bytes exceed the 512-bit scalar range",
                bytes.len()
            )));
        }
        Ok(Self::from_u512(U512::from_big_endian(bytes)))
    }

    /// Decode an encoded scalar of exactly `C::SCALAR_BYTES` bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidScalar` for the wrong length or a value
    /// not below n.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != C::SCALAR_BYTES {
            return Err(CryptoError::InvalidScalar);
        }
        let value = U512::from_big_endian(bytes);
        if value >= Self::order() {
            return Err(CryptoError::InvalidScalar);
        }
        Ok(Self::from_reduced(value))
    }

    /// Integer value of a field element, reduced mod n.
    pub fn from_field_element(x: &FieldElement<C::Field>) -> Self {
        Self::from_u512(U512::from_big_endian(&x.to_bytes()))
    }

    /// Uniformly random non-zero scalar.
    pub fn random() -> Self {
        let order = Self::order();
        let mut bytes = vec![0u8; C::SCALAR_BYTES];
        let excess_bits = C::SCALAR_BYTES * 8 - order.bits();
        loop {
            rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
            bytes[0] &= 0xFF >> excess_bits;
            let value = U512::from_big_endian(&bytes);
            if !value.is_zero() && value < order {
                bytes.zeroize();
                return Self::from_reduced(value);
            }
        }
    }

    /// Encode as `C::SCALAR_BYTES` big-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = [0u8; 64];
        self.value.to_big_endian(&mut buf);
        buf[64 - C::SCALAR_BYTES..].to_vec()
    }

    /// True for zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub(crate) fn as_u512(&self) -> &U512 {
        &self.value
    }

    /// `self + rhs mod n`.
    pub fn add(&self, rhs: &Self) -> Self {
        let order = Self::order();
        let sum = self.value + rhs.value;
        Self::from_reduced(if sum >= order { sum - order } else { sum })
    }

    /// `self - rhs mod n`.
    pub fn sub(&self, rhs: &Self) -> Self {
        Self::from_reduced(sub_mod(self.value, rhs.value, Self::order()))
    }

    /// `self * rhs mod n`, Horner over the 64-bit limbs of `rhs`.
    pub fn mul(&self, rhs: &Self) -> Self {
        let order = Self::order();
        let mut acc = U512::zero();
        for &limb in rhs.value.0.iter().rev() {
            acc = ((acc << 64usize) + self.value * U512::from(limb)) % order;
        }
        Self::from_reduced(acc)
    }

    /// Multiplicative inverse mod n (binary extended Euclid), `None` for zero.
    pub fn invert(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        let order = Self::order();
        let one = U512::one();
        let mut u = self.value;
        let mut v = order;
        let mut x1 = one;
        let mut x2 = U512::zero();

        while u != one && v != one {
            while !u.bit(0) {
                u = u >> 1usize;
                x1 = halve_mod(x1, order);
            }
            while !v.bit(0) {
                v = v >> 1usize;
                x2 = halve_mod(x2, order);
            }
            if u >= v {
                u = u - v;
                x1 = sub_mod(x1, x2, order);
            } else {
                v = v - u;
                x2 = sub_mod(x2, x1, order);
            }
        }

        Some(Self::from_reduced(if u == one { x1 } else { x2 }))
    }
}

impl<C: ZigbeeCurve> fmt::Debug for Scalar<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar<{}>(..)", C::NAME)
    }
}

fn sub_mod(a: U512, b: U512, order: U512) -> U512 {
    if a >= b {
        a - b
    } else {
        a + order - b
    }
}

fn halve_mod(x: U512, order: U512) -> U512 {
    if x.bit(0) {
        (x + order) >> 1usize
    } else {
        x >> 1usize
    }
}

/// Private key on curve `C`: a non-zero scalar, zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey<C: ZigbeeCurve> {
    scalar: Scalar<C>,
}

impl<C: ZigbeeCurve> PrivateKey<C> {
    /// Decode a `C::SCALAR_BYTES` big-endian private key.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidPrivateKey` for the wrong length, zero,
    /// or a value not below n.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let scalar = Scalar::from_bytes(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Self::from_scalar(scalar)
    }

    /// Wrap a scalar.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidPrivateKey` for zero.
    pub fn from_scalar(scalar: Scalar<C>) -> Result<Self, CryptoError> {
        if scalar.is_zero() {
            return Err(CryptoError::InvalidPrivateKey);
        }
        Ok(Self { scalar })
    }

    /// Generate random key.
    pub fn generate() -> Self {
        Self {
            scalar: Scalar::random(),
        }
    }

    /// Public key `d * G`.
    pub fn public_key(&self) -> Point<C> {
        Point::generator().mul(&self.scalar)
    }

    /// Encode as `C::SCALAR_BYTES` big-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.scalar.to_bytes()
    }

    /// The secret scalar.
    pub fn scalar(&self) -> &Scalar<C> {
        &self.scalar
    }
}

impl<C: ZigbeeCurve> Drop for PrivateKey<C> {
    fn drop(&mut self) {
        self.scalar.value.0.zeroize();
    }
}

impl<C: ZigbeeCurve> fmt::Debug for PrivateKey<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey<{}>(..)", C::NAME)
    }
}

/// Field size in bytes for curve `C`, the length of a shared secret.
pub fn field_bytes<C: ZigbeeCurve>() -> usize {
    <C::Field as FieldSpec>::BYTES
}
