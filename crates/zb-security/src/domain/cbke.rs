//! # Certificate-Based Key Establishment
//!
//! Implicit (ECQV) certificates for the two Smart Energy crypto suites and
//! the shared-secret computations built on them.
//!
//! ```text
//! Suite 1 (sect163k1), 48 bytes:
//!   0      22        30       38     48
//!   | P_U  | subject | issuer | data |
//!
//! Suite 2 (sect283k1), 74 bytes:
//!   0    1        9     10   11       19          24        28        36      37    74
//!   |type| serial |curve|hash| issuer | valid from| valid to| subject |usage | P_U |
//! ```
//!
//! The subject's public key is `Q = AES_MMO(certificate) * P_U + Q_CA`.

use crate::domain::entities::ExtendedAddress;
use crate::domain::errors::SecurityError;
use zb_crypto::ecc::{ecdh, ecmqv, reconstruct_public_key, Point, PrivateKey, SharedSecret};
use zb_crypto::{aes_mmo_hash, Digest, Sect163k1, Sect283k1, ZigbeeCurve};

/// Suite 2 certificate type octet.
pub const CERT_TYPE_IMPLICIT: u8 = 0x00;
/// Suite 2 curve identifier for sect283k1.
pub const CURVE_SECT283K1: u8 = 0x0D;
/// Suite 2 hash identifier for AES-MMO.
pub const HASH_AES_MMO: u8 = 0x08;
/// Key usage bit: key agreement.
pub const KEY_USAGE_KEY_AGREEMENT: u8 = 0x08;
/// Key usage bit: digital signature.
pub const KEY_USAGE_DIGITAL_SIGNATURE: u8 = 0x80;
/// Suite 2 `valid to` value meaning no expiry.
pub const NO_EXPIRY: u32 = 0xFFFF_FFFF;

/// An ECQV implicit certificate of one suite.
pub trait ImplicitCertificate: Sized {
    /// Curve the certificate's keys live on.
    type Curve: ZigbeeCurve;

    /// Encoded size in bytes.
    const SIZE: usize;

    /// Encoded size of the other suite's certificate.
    const OTHER_SUITE_SIZE: usize;

    /// Suite label for logs and metrics.
    const SUITE: &'static str;

    /// Parse and check the layout of an encoded certificate.
    ///
    /// # Errors
    ///
    /// `CurveMismatch` for a certificate of the other suite,
    /// `CertificateInvalid` for any other length or layout problem.
    fn parse(bytes: &[u8]) -> Result<Self, SecurityError>;

    /// Encoded certificate.
    fn as_bytes(&self) -> &[u8];

    /// Compressed public-key reconstruction point.
    fn reconstruction_point(&self) -> &[u8];

    /// Subject IEEE address.
    fn subject(&self) -> ExtendedAddress;

    /// Issuer identifier.
    fn issuer(&self) -> u64;

    /// Fail unless the certificate may be used for key agreement.
    fn require_key_agreement(&self) -> Result<(), SecurityError> {
        Ok(())
    }

    /// AES-MMO hash of the encoded certificate.
    fn digest(&self) -> Digest {
        aes_mmo_hash(self.as_bytes())
    }

    /// Reconstruct the subject public key.
    ///
    /// # Errors
    ///
    /// `CertificateInvalid` if the reconstruction point does not decode or
    /// the key lands on the identity.
    fn public_key(
        &self,
        ca_public: &Point<Self::Curve>,
    ) -> Result<Point<Self::Curve>, SecurityError> {
        self.public_key_with_digest(ca_public, &self.digest())
    }

    /// Reconstruct the subject public key with an externally supplied
    /// certificate digest.
    ///
    /// # Errors
    ///
    /// Same as [`ImplicitCertificate::public_key`].
    fn public_key_with_digest(
        &self,
        ca_public: &Point<Self::Curve>,
        cert_digest: &[u8],
    ) -> Result<Point<Self::Curve>, SecurityError> {
        let reconstruction = Point::<Self::Curve>::from_compressed(self.reconstruction_point())
            .map_err(|e| SecurityError::CertificateInvalid(format!("reconstruction point: {e}")))?;
        reconstruct_public_key(&reconstruction, cert_digest, ca_public)
            .map_err(|e| SecurityError::CertificateInvalid(format!("public key: {e}")))
    }
}

fn check_length<T: ImplicitCertificate>(bytes: &[u8]) -> Result<(), SecurityError> {
    if bytes.len() == T::SIZE {
        Ok(())
    } else if bytes.len() == T::OTHER_SUITE_SIZE {
        Err(SecurityError::CurveMismatch)
    } else {
        Err(SecurityError::CertificateInvalid(format!(
            "{} certificate must be {} bytes, got {}",
            T::SUITE,
            T::SIZE,
            bytes.len()
        )))
    }
}

fn check_point_prefix(point: &[u8]) -> Result<(), SecurityError> {
    match point.first() {
        Some(0x02) | Some(0x03) => Ok(()),
        _ => Err(SecurityError::CertificateInvalid(
            "reconstruction point is not SEC1 compressed".to_string(),
        )),
    }
}

fn be_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

// =============================================================================
// SUITE 1
// =============================================================================

/// Suite 1 (sect163k1) implicit certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct CbkeCertificate {
    bytes: [u8; 48],
}

impl CbkeCertificate {
    /// Issuer-defined profile data.
    pub fn profile_data(&self) -> &[u8] {
        &self.bytes[38..48]
    }
}

impl ImplicitCertificate for CbkeCertificate {
    type Curve = Sect163k1;
    const SIZE: usize = 48;
    const OTHER_SUITE_SIZE: usize = 74;
    const SUITE: &'static str = "cbke1";

    fn parse(bytes: &[u8]) -> Result<Self, SecurityError> {
        check_length::<Self>(bytes)?;
        let mut cert = [0u8; 48];
        cert.copy_from_slice(bytes);
        check_point_prefix(&cert[..22])?;
        Ok(Self { bytes: cert })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn reconstruction_point(&self) -> &[u8] {
        &self.bytes[..22]
    }

    fn subject(&self) -> ExtendedAddress {
        be_u64(&self.bytes[22..30])
    }

    fn issuer(&self) -> u64 {
        be_u64(&self.bytes[30..38])
    }
}

impl std::fmt::Debug for CbkeCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbkeCertificate")
            .field("subject", &format_args!("{:016X}", self.subject()))
            .field("issuer", &format_args!("{:016X}", self.issuer()))
            .finish()
    }
}

// =============================================================================
// SUITE 2
// =============================================================================

/// Suite 2 (sect283k1) implicit certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct Cbke2Certificate {
    bytes: [u8; 74],
}

impl Cbke2Certificate {
    /// Serial number.
    pub fn serial(&self) -> u64 {
        be_u64(&self.bytes[1..9])
    }

    /// Start of validity (5-byte time value).
    pub fn valid_from(&self) -> u64 {
        be_u64(&self.bytes[19..24])
    }

    /// End of validity; [`NO_EXPIRY`] means none.
    pub fn valid_to(&self) -> u32 {
        be_u64(&self.bytes[24..28]) as u32
    }

    /// Whether `time` falls within the validity window.
    pub fn is_valid_at(&self, time: u64) -> bool {
        time >= self.valid_from()
            && (self.valid_to() == NO_EXPIRY || time <= u64::from(self.valid_to()))
    }

    /// Key usage bit field.
    pub fn key_usage(&self) -> u8 {
        self.bytes[36]
    }
}

impl ImplicitCertificate for Cbke2Certificate {
    type Curve = Sect283k1;
    const SIZE: usize = 74;
    const OTHER_SUITE_SIZE: usize = 48;
    const SUITE: &'static str = "cbke2";

    fn parse(bytes: &[u8]) -> Result<Self, SecurityError> {
        check_length::<Self>(bytes)?;
        if bytes[9] != CURVE_SECT283K1 {
            return Err(SecurityError::CurveMismatch);
        }
        if bytes[0] != CERT_TYPE_IMPLICIT {
            return Err(SecurityError::CertificateInvalid(format!(
                "certificate type 0x{:02X}",
                bytes[0]
            )));
        }
        if bytes[10] != HASH_AES_MMO {
            return Err(SecurityError::CertificateInvalid(format!(
                "hash algorithm 0x{:02X}",
                bytes[10]
            )));
        }
        let mut cert = [0u8; 74];
        cert.copy_from_slice(bytes);
        check_point_prefix(&cert[37..])?;
        Ok(Self { bytes: cert })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn reconstruction_point(&self) -> &[u8] {
        &self.bytes[37..]
    }

    fn subject(&self) -> ExtendedAddress {
        be_u64(&self.bytes[28..36])
    }

    fn issuer(&self) -> u64 {
        be_u64(&self.bytes[11..19])
    }

    fn require_key_agreement(&self) -> Result<(), SecurityError> {
        if self.key_usage() & KEY_USAGE_KEY_AGREEMENT == 0 {
            return Err(SecurityError::CertificateInvalid(
                "key usage excludes key agreement".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Cbke2Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cbke2Certificate")
            .field("serial", &format_args!("{:016X}", self.serial()))
            .field("subject", &format_args!("{:016X}", self.subject()))
            .field("issuer", &format_args!("{:016X}", self.issuer()))
            .field("key_usage", &format_args!("0x{:02X}", self.key_usage()))
            .finish()
    }
}

// =============================================================================
// LOCAL KEY MATERIAL
// =============================================================================

/// Local static private key and pinned CA public key for one suite.
#[derive(Clone, Debug)]
pub struct CbkeKeys<C: ZigbeeCurve> {
    private: PrivateKey<C>,
    ca_public: Point<C>,
}

/// Suite 1 key material.
pub type CbkePrivate = CbkeKeys<Sect163k1>;

/// Suite 2 key material.
pub type Cbke2Private = CbkeKeys<Sect283k1>;

impl<C: ZigbeeCurve> CbkeKeys<C> {
    /// Decode a big-endian private key and a compressed CA public key.
    ///
    /// # Errors
    ///
    /// `MalformedInput` for wrong lengths, `CertificateInvalid` for a CA
    /// key that is not on the curve.
    pub fn from_bytes(private: &[u8], ca_public: &[u8]) -> Result<Self, SecurityError> {
        if private.len() != C::SCALAR_BYTES || ca_public.len() != C::POINT_BYTES {
            return Err(SecurityError::MalformedInput(format!(
                "{} keys need {} + {} bytes, got {} + {}",
                C::NAME,
                C::SCALAR_BYTES,
                C::POINT_BYTES,
                private.len(),
                ca_public.len()
            )));
        }
        let private = PrivateKey::from_bytes(private)
            .map_err(|e| SecurityError::MalformedInput(format!("private key: {e}")))?;
        let ca_public = Point::from_compressed(ca_public)
            .map_err(|e| SecurityError::CertificateInvalid(format!("CA public key: {e}")))?;
        Ok(Self { private, ca_public })
    }

    /// Wrap already-decoded keys.
    pub fn new(private: PrivateKey<C>, ca_public: Point<C>) -> Self {
        Self { private, ca_public }
    }

    /// Static private key.
    pub fn private_key(&self) -> &PrivateKey<C> {
        &self.private
    }

    /// Pinned CA public key.
    pub fn ca_public(&self) -> &Point<C> {
        &self.ca_public
    }
}

/// Ephemeral key pair for one ECMQV exchange.
#[derive(Clone, Debug)]
pub struct EphemeralKeyPair<C: ZigbeeCurve> {
    private: PrivateKey<C>,
    public: Point<C>,
}

impl<C: ZigbeeCurve> EphemeralKeyPair<C> {
    /// Fresh random pair.
    pub fn generate() -> Self {
        Self::from_private(PrivateKey::generate())
    }

    /// Pair for a known private key.
    pub fn from_private(private: PrivateKey<C>) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// Public half.
    pub fn public_key(&self) -> &Point<C> {
        &self.public
    }

    /// Compressed public half, as sent to the peer.
    ///
    /// # Errors
    ///
    /// Never for a generated pair; kept fallible to mirror point encoding.
    pub fn public_bytes(&self) -> Result<Vec<u8>, SecurityError> {
        Ok(self.public.to_compressed()?)
    }
}

// =============================================================================
// SHARED SECRETS
// =============================================================================

/// Static cofactor ECDH with the key certified by `peer_certificate`.
///
/// # Errors
///
/// `CurveMismatch` for a certificate of the other suite, otherwise
/// `CertificateInvalid`.
pub fn derive_shared_secret<T: ImplicitCertificate>(
    peer_certificate: &[u8],
    keys: &CbkeKeys<T::Curve>,
) -> Result<SharedSecret, SecurityError> {
    let certificate = T::parse(peer_certificate)?;
    certificate.require_key_agreement()?;
    let peer_public = certificate.public_key(keys.ca_public())?;
    ecdh(keys.private_key(), &peer_public)
        .map_err(|e| SecurityError::CertificateInvalid(format!("agreement: {e}")))
}

/// ECMQV with static keys from certificates and one ephemeral pair each.
///
/// # Errors
///
/// As [`derive_shared_secret`]; `MalformedInput` if the peer ephemeral key
/// does not decode.
pub fn derive_mqv_shared_secret<T: ImplicitCertificate>(
    peer_certificate: &[u8],
    peer_ephemeral: &[u8],
    keys: &CbkeKeys<T::Curve>,
    own_ephemeral: &EphemeralKeyPair<T::Curve>,
) -> Result<SharedSecret, SecurityError> {
    let certificate = T::parse(peer_certificate)?;
    certificate.require_key_agreement()?;
    let peer_static = certificate.public_key(keys.ca_public())?;
    let peer_ephemeral = Point::<T::Curve>::from_compressed(peer_ephemeral)
        .map_err(|e| SecurityError::MalformedInput(format!("peer ephemeral key: {e}")))?;

    ecmqv(
        keys.private_key(),
        &own_ephemeral.private,
        &own_ephemeral.public,
        &peer_static,
        &peer_ephemeral,
    )
    .map_err(|e| SecurityError::CertificateInvalid(format!("agreement: {e}")))
}
