//! # ECDSA Signatures (sect163k1 / sect283k1)
//!
//! ECDSA over the Zigbee Koblitz curves, used to sign OTA upgrade images.
//! The message digest is AES-MMO, so it is always shorter than the group
//! order and is used as an integer without truncation.
//!
//! ## Security Properties
//!
//! - Signature components are range-checked before any curve arithmetic
//! - Random nonces come from the thread RNG; a fixed nonce is test-only

use crate::ecc::{Point, PrivateKey, Scalar, ZigbeeCurve};
use crate::CryptoError;

/// ECDSA signature `(r, s)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcdsaSignature<C: ZigbeeCurve> {
    r: Scalar<C>,
    s: Scalar<C>,
}

impl<C: ZigbeeCurve> EcdsaSignature<C> {
    /// Decode big-endian `r` and `s`, each `C::SCALAR_BYTES` long.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidSignatureFormat` for a wrong length or a
    /// component outside `[1, n-1]`.
    pub fn from_components(r: &[u8], s: &[u8]) -> Result<Self, CryptoError> {
        let r = Scalar::from_bytes(r).map_err(|_| CryptoError::InvalidSignatureFormat)?;
        let s = Scalar::from_bytes(s).map_err(|_| CryptoError::InvalidSignatureFormat)?;
        if r.is_zero() || s.is_zero() {
            return Err(CryptoError::InvalidSignatureFormat);
        }
        Ok(Self { r, s })
    }

    /// Decode `r || s`.
    ///
    /// # Errors
    ///
    /// Same as [`EcdsaSignature::from_components`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 2 * C::SCALAR_BYTES {
            return Err(CryptoError::InvalidSignatureFormat);
        }
        let (r, s) = bytes.split_at(C::SCALAR_BYTES);
        Self::from_components(r, s)
    }

    /// Encode as `r || s`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.r.to_bytes();
        out.extend_from_slice(&self.s.to_bytes());
        out
    }

    /// `r` component.
    pub fn r(&self) -> &Scalar<C> {
        &self.r
    }

    /// `s` component.
    pub fn s(&self) -> &Scalar<C> {
        &self.s
    }
}

fn digest_scalar<C: ZigbeeCurve>(digest: &[u8]) -> Result<Scalar<C>, CryptoError> {
    if digest.is_empty() || digest.len() > C::SCALAR_BYTES {
        return Err(CryptoError::InvalidInput(format!(
            "digest of {} bytes",
            digest.len()
        )));
    }
    Scalar::from_bytes_reduced(digest)
}

/// ECDSA verifier bound to one public key.
#[derive(Clone, Copy, Debug)]
pub struct EcdsaVerifier<C: ZigbeeCurve> {
    public_key: Point<C>,
}

impl<C: ZigbeeCurve> EcdsaVerifier<C> {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidPoint` for the identity or an off-curve key.
    pub fn new(public_key: Point<C>) -> Result<Self, CryptoError> {
        if public_key.is_infinity() || !public_key.is_on_curve() {
            return Err(CryptoError::InvalidPoint);
        }
        Ok(Self { public_key })
    }

    /// Verify `signature` over `digest`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SignatureVerificationFailed` if it does not verify.
    pub fn verify(&self, digest: &[u8], signature: &EcdsaSignature<C>) -> Result<(), CryptoError> {
        let e = digest_scalar::<C>(digest)?;
        let w = signature
            .s
            .invert()
            .ok_or(CryptoError::SignatureVerificationFailed)?;
        let u1 = e.mul(&w);
        let u2 = signature.r.mul(&w);

        let x = Point::generator()
            .mul(&u1)
            .add(&self.public_key.mul(&u2));
        let v = x
            .x()
            .map(|x| Scalar::<C>::from_field_element(&x))
            .ok_or(CryptoError::SignatureVerificationFailed)?;

        if v == signature.r {
            Ok(())
        } else {
            Err(CryptoError::SignatureVerificationFailed)
        }
    }
}

/// ECDSA signer.
#[derive(Clone, Debug)]
pub struct EcdsaSigner<C: ZigbeeCurve> {
    private_key: PrivateKey<C>,
}

impl<C: ZigbeeCurve> EcdsaSigner<C> {
    /// Create a signer.
    pub fn new(private_key: PrivateKey<C>) -> Self {
        Self { private_key }
    }

    /// Matching verifier.
    pub fn verifier(&self) -> EcdsaVerifier<C> {
        EcdsaVerifier {
            public_key: self.private_key.public_key(),
        }
    }

    /// Sign `digest` with a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidInput` for an empty or oversized digest.
    pub fn sign(&self, digest: &[u8]) -> Result<EcdsaSignature<C>, CryptoError> {
        loop {
            let nonce = PrivateKey::generate();
            match self.sign_with_nonce(digest, &nonce) {
                Err(CryptoError::InvalidSignatureFormat) => continue,
                other => return other,
            }
        }
    }

    /// Sign with a caller-chosen nonce `k`.
    ///
    /// Reusing `k` across two digests reveals the private key; this exists
    /// for known-answer tests and fixture generation.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidSignatureFormat` if `k` yields `r = 0`
    /// or `s = 0`.
    pub fn sign_with_nonce(
        &self,
        digest: &[u8],
        nonce: &PrivateKey<C>,
    ) -> Result<EcdsaSignature<C>, CryptoError> {
        let e = digest_scalar::<C>(digest)?;
        let r = nonce
            .public_key()
            .x()
            .map(|x| Scalar::<C>::from_field_element(&x))
            .ok_or(CryptoError::InvalidSignatureFormat)?;
        let k_inv = nonce
            .scalar()
            .invert()
            .ok_or(CryptoError::InvalidSignatureFormat)?;
        let s = k_inv.mul(&e.add(&r.mul(self.private_key.scalar())));
        if r.is_zero() || s.is_zero() {
            return Err(CryptoError::InvalidSignatureFormat);
        }
        Ok(EcdsaSignature { r, s })
    }
}
