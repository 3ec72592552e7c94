//! Koblitz curves `y^2 + xy = x^3 + a*x^2 + 1` over GF(2^m).
//!
//! Points are kept in affine coordinates. Zigbee exchanges them in SEC1
//! compressed form only: a prefix of `0x02 | y~` followed by x, where
//! `y~` is the low bit of `y / x`.

use super::field::{FieldElement, FieldSpec, F163, F283};
use super::scalar::Scalar;
use crate::CryptoError;
use primitive_types::U512;
use std::fmt;

/// Domain parameters of a Zigbee Smart Energy curve.
pub trait ZigbeeCurve: Copy + Clone + fmt::Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Underlying binary field.
    type Field: FieldSpec;
    /// SEC 2 curve name.
    const NAME: &'static str;
    /// Curve coefficient a (0 or 1).
    const A: u64;
    /// Curve coefficient b.
    const B: u64;
    /// Generator x, big-endian.
    const GX: &'static [u8];
    /// Generator y, big-endian.
    const GY: &'static [u8];
    /// Prime order n of the generator, big-endian.
    const ORDER: &'static [u8];
    /// Cofactor h.
    const COFACTOR: u64;
    /// Encoded private key / signature component size.
    const SCALAR_BYTES: usize;
    /// Compressed point size.
    const POINT_BYTES: usize = 1 + <Self::Field as FieldSpec>::BYTES;
}

/// sect163k1, used by CBKE crypto suite 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sect163k1;

impl ZigbeeCurve for Sect163k1 {
    type Field = F163;
    const NAME: &'static str = "sect163k1";
    const A: u64 = 1;
    const B: u64 = 1;
    const GX: &'static [u8] = &[
        0x02, 0xFE, 0x13, 0xC0, 0x53, 0x7B, 0xBC, 0x11, 0xAC, 0xAA, 0x07, 0xD7,
        0x93, 0xDE, 0x4E, 0x6D, 0x5E, 0x5C, 0x94, 0xEE, 0xE8,
    ];
    const GY: &'static [u8] = &[
        0x02, 0x89, 0x07, 0x0F, 0xB0, 0x5D, 0x38, 0xFF, 0x58, 0x32, 0x1F, 0x2E,
        0x80, 0x05, 0x36, 0xD5, 0x38, 0xCC, 0xDA, 0xA3, 0xD9,
    ];
    const ORDER: &'static [u8] = &[
        0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x01,
        0x08, 0xA2, 0xE0, 0xCC, 0x0D, 0x99, 0xF8, 0xA5, 0xEF,
    ];
    const COFACTOR: u64 = 2;
    const SCALAR_BYTES: usize = 21;
}

/// sect283k1, used by CBKE crypto suite 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sect283k1;

impl ZigbeeCurve for Sect283k1 {
    type Field = F283;
    const NAME: &'static str = "sect283k1";
    const A: u64 = 0;
    const B: u64 = 1;
    const GX: &'static [u8] = &[
        0x05, 0x03, 0x21, 0x3F, 0x78, 0xCA, 0x44, 0x88, 0x3F, 0x1A, 0x3B, 0x81,
        0x62, 0xF1, 0x88, 0xE5, 0x53, 0xCD, 0x26, 0x5F, 0x23, 0xC1, 0x56, 0x7A,
        0x16, 0x87, 0x69, 0x13, 0xB0, 0xC2, 0xAC, 0x24, 0x58, 0x49, 0x28, 0x36,
    ];
    const GY: &'static [u8] = &[
        0x01, 0xCC, 0xDA, 0x38, 0x0F, 0x1C, 0x9E, 0x31, 0x8D, 0x90, 0xF9, 0x5D,
        0x07, 0xE5, 0x42, 0x6F, 0xE8, 0x7E, 0x45, 0xC0, 0xE8, 0x18, 0x46, 0x98,
        0xE4, 0x59, 0x62, 0x36, 0x4E, 0x34, 0x11, 0x61, 0x77, 0xDD, 0x22, 0x59,
    ];
    const ORDER: &'static [u8] = &[
        0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xE9, 0xAE, 0x2E, 0xD0, 0x75, 0x77,
        0x26, 0x5D, 0xFF, 0x7F, 0x94, 0x45, 0x1E, 0x06, 0x1E, 0x16, 0x3C, 0x61,
    ];
    const COFACTOR: u64 = 4;
    const SCALAR_BYTES: usize = 36;
}

type Fe<C> = FieldElement<<C as ZigbeeCurve>::Field>;

/// Affine point on curve `C`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Point<C: ZigbeeCurve> {
    /// Point at infinity (group identity).
    Infinity,
    /// Finite point.
    Affine {
        /// x coordinate
        x: Fe<C>,
        /// y coordinate
        y: Fe<C>,
    },
}

impl<C: ZigbeeCurve> Point<C> {
    /// Base point G.
    pub fn generator() -> Self {
        Self::Affine {
            x: FieldElement::from_be_bytes_unchecked(C::GX),
            y: FieldElement::from_be_bytes_unchecked(C::GY),
        }
    }

    /// True for the group identity.
    pub fn is_infinity(&self) -> bool {
        matches!(self, Self::Infinity)
    }

    /// x coordinate of a finite point.
    pub fn x(&self) -> Option<Fe<C>> {
        match self {
            Self::Infinity => None,
            Self::Affine { x, .. } => Some(*x),
        }
    }

    /// Check `y^2 + xy = x^3 + a*x^2 + b`.
    pub fn is_on_curve(&self) -> bool {
        match self {
            Self::Infinity => true,
            Self::Affine { x, y } => {
                let x2 = x.square();
                let lhs = y.square().add(&x.mul(y));
                let rhs = x2
                    .mul(x)
                    .add(&x2.mul(&coefficient_a::<C>()))
                    .add(&coefficient_b::<C>());
                lhs == rhs
            }
        }
    }

    /// Additive inverse `(x, x + y)`.
    pub fn negate(&self) -> Self {
        match self {
            Self::Infinity => Self::Infinity,
            Self::Affine { x, y } => Self::Affine { x: *x, y: x.add(y) },
        }
    }

    /// Point addition.
    pub fn add(&self, other: &Self) -> Self {
        let (x1, y1, x2, y2) = match (self, other) {
            (Self::Infinity, _) => return *other,
            (_, Self::Infinity) => return *self,
            (Self::Affine { x: x1, y: y1 }, Self::Affine { x: x2, y: y2 }) => (x1, y1, x2, y2),
        };

        if x1 == x2 {
            return if y1 == y2 {
                self.double()
            } else {
                Self::Infinity
            };
        }

        let dx = x1.add(x2);
        let Some(dx_inv) = dx.invert() else {
            return Self::Infinity;
        };
        let lambda = y1.add(y2).mul(&dx_inv);
        let x3 = lambda
            .square()
            .add(&lambda)
            .add(&dx)
            .add(&coefficient_a::<C>());
        let y3 = lambda.mul(&x1.add(&x3)).add(&x3).add(y1);
        Self::Affine { x: x3, y: y3 }
    }

    /// Point doubling.
    pub fn double(&self) -> Self {
        let Self::Affine { x, y } = self else {
            return Self::Infinity;
        };
        // x = 0 is the 2-torsion point
        let Some(x_inv) = x.invert() else {
            return Self::Infinity;
        };
        let lambda = x.add(&y.mul(&x_inv));
        let x3 = lambda
            .square()
            .add(&lambda)
            .add(&coefficient_a::<C>());
        let y3 = x.square().add(&lambda.mul(&x3)).add(&x3);
        Self::Affine { x: x3, y: y3 }
    }

    /// Scalar multiplication `k * self`.
    pub fn mul(&self, k: &Scalar<C>) -> Self {
        self.mul_u512(k.as_u512())
    }

    /// Multiply by the cofactor h.
    pub fn mul_by_cofactor(&self) -> Self {
        self.mul_u512(&U512::from(C::COFACTOR))
    }

    /// Montgomery ladder: one addition and one doubling per bit of `k`.
    pub(crate) fn mul_u512(&self, k: &U512) -> Self {
        let mut r0 = Self::Infinity;
        let mut r1 = *self;
        for i in (0..k.bits()).rev() {
            if k.bit(i) {
                r0 = r0.add(&r1);
                r1 = r1.double();
            } else {
                r1 = r0.add(&r1);
                r0 = r0.double();
            }
        }
        r0
    }

    /// Decode a SEC1 compressed point.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidPoint` for a wrong length or prefix, an
    /// x outside the field, or an x with no point on the curve.
    pub fn from_compressed(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != C::POINT_BYTES {
            return Err(CryptoError::InvalidPoint);
        }
        let y_bit = match bytes[0] {
            0x02 => false,
            0x03 => true,
            _ => return Err(CryptoError::InvalidPoint),
        };
        let x: Fe<C> = FieldElement::from_bytes(&bytes[1..]).ok_or(CryptoError::InvalidPoint)?;

        if x.is_zero() {
            return Ok(Self::Affine {
                x,
                y: coefficient_b::<C>().sqrt(),
            });
        }

        // Substituting y = x*z gives z^2 + z = x + a + b/x^2
        let x_inv = x.invert().ok_or(CryptoError::InvalidPoint)?;
        let beta = x
            .add(&coefficient_a::<C>())
            .add(&coefficient_b::<C>().mul(&x_inv.square()));
        let mut z = FieldElement::solve_quadratic(&beta).ok_or(CryptoError::InvalidPoint)?;
        if z.bit(0) != y_bit {
            z = z.add(&FieldElement::one());
        }

        let point = Self::Affine { x, y: x.mul(&z) };
        if point.is_on_curve() {
            Ok(point)
        } else {
            Err(CryptoError::InvalidPoint)
        }
    }

    /// Encode as a SEC1 compressed point.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::PointAtInfinity` for the identity, which has no
    /// compressed form.
    pub fn to_compressed(&self) -> Result<Vec<u8>, CryptoError> {
        let Self::Affine { x, y } = self else {
            return Err(CryptoError::PointAtInfinity);
        };
        let y_bit = match x.invert() {
            Some(x_inv) => y.mul(&x_inv).bit(0),
            None => false,
        };
        let mut out = Vec::with_capacity(C::POINT_BYTES);
        out.push(0x02 | u8::from(y_bit));
        out.extend_from_slice(&x.to_bytes());
        Ok(out)
    }
}

impl<C: ZigbeeCurve> fmt::Debug for Point<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infinity => write!(f, "Point<{}>(infinity)", C::NAME),
            Self::Affine { x, y } => write!(f, "Point<{}>({x:?}, {y:?})", C::NAME),
        }
    }
}

fn coefficient_a<C: ZigbeeCurve>() -> Fe<C> {
    FieldElement::from_u64(C::A)
}

fn coefficient_b<C: ZigbeeCurve>() -> Fe<C> {
    FieldElement::from_u64(C::B)
}
