//! Binary field arithmetic over GF(2^m) in a polynomial basis.
//!
//! Elements are stored as five little-endian 64-bit limbs, which covers both
//! m = 163 and m = 283. Bit `i` of the element is the coefficient of `x^i`.

use std::fmt;
use std::marker::PhantomData;

/// Limbs per field element.
pub const LIMBS: usize = 5;

type Limbs = [u64; LIMBS];

/// Parameters of one binary field.
pub trait FieldSpec: Copy + Clone + fmt::Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Extension degree m.
    const DEGREE: usize;
    /// Reduction polynomial with the leading `x^m` term removed.
    const REDUCTION: Limbs;
    /// Encoded element size in bytes.
    const BYTES: usize = (Self::DEGREE + 7) / 8;
}

/// GF(2^163) with f(x) = x^163 + x^7 + x^6 + x^3 + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct F163;

impl FieldSpec for F163 {
    const DEGREE: usize = 163;
    const REDUCTION: Limbs = [(1 << 7) | (1 << 6) | (1 << 3) | 1, 0, 0, 0, 0];
}

/// GF(2^283) with f(x) = x^283 + x^12 + x^7 + x^5 + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct F283;

impl FieldSpec for F283 {
    const DEGREE: usize = 283;
    const REDUCTION: Limbs = [(1 << 12) | (1 << 7) | (1 << 5) | 1, 0, 0, 0, 0];
}

/// Element of the binary field `F`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FieldElement<F: FieldSpec> {
    limbs: Limbs,
    _field: PhantomData<F>,
}

impl<F: FieldSpec> FieldElement<F> {
    /// Additive identity.
    pub const fn zero() -> Self {
        Self::from_limbs([0; LIMBS])
    }

    /// Multiplicative identity.
    pub const fn one() -> Self {
        Self::from_limbs([1, 0, 0, 0, 0])
    }

    /// Element with a single low word; used for curve coefficients.
    pub const fn from_u64(value: u64) -> Self {
        Self::from_limbs([value, 0, 0, 0, 0])
    }

    const fn from_limbs(limbs: Limbs) -> Self {
        Self {
            limbs,
            _field: PhantomData,
        }
    }

    /// Decode a big-endian element of exactly `F::BYTES` bytes.
    ///
    /// Returns `None` for the wrong length or a value of degree `>= m`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != F::BYTES {
            return None;
        }
        let element = Self::from_be_bytes_unchecked(bytes);
        match element.degree() {
            Some(d) if d >= F::DEGREE => None,
            _ => Some(element),
        }
    }

    /// Decode trusted big-endian constants of at most 40 bytes.
    pub(crate) fn from_be_bytes_unchecked(bytes: &[u8]) -> Self {
        let mut limbs = [0u64; LIMBS];
        for (i, byte) in bytes.iter().rev().take(LIMBS * 8).enumerate() {
            limbs[i / 8] |= u64::from(*byte) << ((i % 8) * 8);
        }
        Self::from_limbs(limbs)
    }

    /// Encode as `F::BYTES` big-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        (0..F::BYTES)
            .rev()
            .map(|i| (self.limbs[i / 8] >> ((i % 8) * 8)) as u8)
            .collect()
    }

    /// True for the additive identity.
    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&limb| limb == 0)
    }

    /// Coefficient of `x^i`.
    pub fn bit(&self, i: usize) -> bool {
        i < LIMBS * 64 && (self.limbs[i / 64] >> (i % 64)) & 1 == 1
    }

    /// Degree of the polynomial, `None` for zero.
    pub fn degree(&self) -> Option<usize> {
        degree(&self.limbs)
    }

    /// Field addition (XOR).
    pub fn add(&self, rhs: &Self) -> Self {
        let mut limbs = self.limbs;
        xor_assign(&mut limbs, &rhs.limbs);
        Self::from_limbs(limbs)
    }

    /// Field multiplication, MSB-first shift-and-add with interleaved reduction.
    pub fn mul(&self, rhs: &Self) -> Self {
        let mut acc = [0u64; LIMBS];
        for i in (0..F::DEGREE).rev() {
            Self::shl1_reduce(&mut acc);
            if rhs.bit(i) {
                xor_assign(&mut acc, &self.limbs);
            }
        }
        Self::from_limbs(acc)
    }

    /// Field squaring.
    pub fn square(&self) -> Self {
        self.mul(self)
    }

    /// Apply the Frobenius map `n` times (`self^(2^n)`).
    pub fn square_n(&self, n: usize) -> Self {
        (0..n).fold(*self, |acc, _| acc.square())
    }

    /// Multiplicative inverse, `None` for zero.
    ///
    /// Binary extended Euclid on `(a, f)`, keeping `g1 * a = u` and
    /// `g2 * a = v` modulo f.
    pub fn invert(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        let modulus = Self::modulus();
        let mut u = self.limbs;
        let mut v = modulus;
        let mut g1 = Self::one().limbs;
        let mut g2 = [0u64; LIMBS];

        while !is_one(&u) && !is_one(&v) {
            while u[0] & 1 == 0 {
                shr1(&mut u);
                if g1[0] & 1 == 1 {
                    xor_assign(&mut g1, &modulus);
                }
                shr1(&mut g1);
            }
            while v[0] & 1 == 0 {
                shr1(&mut v);
                if g2[0] & 1 == 1 {
                    xor_assign(&mut g2, &modulus);
                }
                shr1(&mut g2);
            }
            if degree(&u) > degree(&v) {
                xor_assign(&mut u, &v);
                xor_assign(&mut g1, &g2);
            } else {
                xor_assign(&mut v, &u);
                xor_assign(&mut g2, &g1);
            }
        }

        Some(Self::from_limbs(if is_one(&u) { g1 } else { g2 }))
    }

    /// Square root; unique in characteristic 2 and equal to `a^(2^(m-1))`.
    pub fn sqrt(&self) -> Self {
        self.square_n(F::DEGREE - 1)
    }

    /// Absolute trace `Tr(a) = a + a^2 + ... + a^(2^(m-1))`, either 0 or 1.
    pub fn trace(&self) -> bool {
        let mut t = *self;
        let mut acc = *self;
        for _ in 1..F::DEGREE {
            t = t.square();
            acc = acc.add(&t);
        }
        acc.bit(0)
    }

    /// Half-trace `H(a) = sum a^(2^(2i))` for `i = 0..=(m-1)/2`.
    ///
    /// For odd m and `Tr(a) = 0`, `z = H(a)` solves `z^2 + z = a`.
    pub fn half_trace(&self) -> Self {
        let mut t = *self;
        let mut acc = *self;
        for _ in 0..(F::DEGREE - 1) / 2 {
            t = t.square_n(2);
            acc = acc.add(&t);
        }
        acc
    }

    /// Solve `z^2 + z = beta`, returning one of the two roots.
    pub fn solve_quadratic(beta: &Self) -> Option<Self> {
        let z = beta.half_trace();
        if z.square().add(&z) == *beta {
            Some(z)
        } else {
            None
        }
    }

    fn modulus() -> Limbs {
        let mut m = F::REDUCTION;
        m[F::DEGREE / 64] |= 1 << (F::DEGREE % 64);
        m
    }

    fn shl1_reduce(v: &mut Limbs) {
        let mut carry = 0u64;
        for limb in v.iter_mut() {
            let next = *limb >> 63;
            *limb = (*limb << 1) | carry;
            carry = next;
        }
        let (word, bit) = (F::DEGREE / 64, F::DEGREE % 64);
        if (v[word] >> bit) & 1 == 1 {
            v[word] ^= 1 << bit;
            xor_assign(v, &F::REDUCTION);
        }
    }
}

impl<F: FieldSpec> Default for FieldElement<F> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<F: FieldSpec> fmt::Debug for FieldElement<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement(")?;
        for byte in self.to_bytes() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

fn xor_assign(a: &mut Limbs, b: &Limbs) {
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x ^= y;
    }
}

fn shr1(v: &mut Limbs) {
    for i in 0..LIMBS {
        let high = if i + 1 < LIMBS { v[i + 1] << 63 } else { 0 };
        v[i] = (v[i] >> 1) | high;
    }
}

fn is_one(v: &Limbs) -> bool {
    v[0] == 1 && v[1..].iter().all(|&limb| limb == 0)
}

fn degree(v: &Limbs) -> Option<usize> {
    v.iter()
        .enumerate()
        .rev()
        .find(|(_, &limb)| limb != 0)
        .map(|(i, limb)| i * 64 + 63 - limb.leading_zeros() as usize)
}
