//! # Security Errors
//!
//! Error types for frame security, key management and credential
//! validation, and their mapping onto the boundary status codes.

use crate::domain::entities::KeyId;
use thiserror::Error;
use zb_crypto::CryptoError;

/// Why an install code was rejected.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum InstallCodeError {
    /// Trailing CRC-16/X-25 does not match the code content
    #[error("install code CRC mismatch: expected 0x{expected:04X}, got 0x{actual:04X}")]
    CrcMismatch {
        /// CRC computed over the content
        expected: u16,
        /// CRC carried by the code
        actual: u16,
    },

    /// Total length is not 8, 10, 14 or 18 bytes
    #[error("unsupported install code length {0}")]
    UnsupportedLength(usize),
}

/// Errors raised by the security subsystem.
///
/// No variant is retried internally; every failure is local to the
/// operation that raised it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecurityError {
    /// Auxiliary header or security control octet is invalid
    #[error("Malformed security header: {0}")]
    MalformedHeader(String),

    /// Key material is not 16 bytes
    #[error("Invalid key length: expected 16, got {actual}")]
    InvalidKeyLength {
        /// Supplied length
        actual: usize,
    },

    /// Install code failed validation
    #[error("Invalid install code: {0}")]
    InvalidInstallCode(#[from] InstallCodeError),

    /// Frame counter not above the last accepted value
    #[error("Replayed frame counter {frame_counter} (last accepted {last_accepted})")]
    Replay {
        /// Counter carried by the frame
        frame_counter: u32,
        /// Last counter accepted for the same peer and key
        last_accepted: u32,
    },

    /// Frame counter reached 0xFFFFFFFF; the key must be replaced
    #[error("Frame counter exhausted")]
    CounterExhausted,

    /// MIC did not verify under any candidate key
    #[error("Frame authentication failed")]
    AuthFailure,

    /// Certificate layout or key reconstruction failed
    #[error("Invalid certificate: {0}")]
    CertificateInvalid(String),

    /// Certificate and key material belong to different curves
    #[error("Certificate and key belong to different curves")]
    CurveMismatch,

    /// Wrong-length or otherwise malformed input
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Signature does not verify or names the wrong signer
    #[error("Signature invalid")]
    SignatureInvalid,

    /// Signature suite other than 1 or 2
    #[error("Unsupported signature suite {0}")]
    UnsupportedSuite(u8),

    /// No key is installed for the requested identifier
    #[error("No key found for {key_id:?}")]
    KeyNotFound {
        /// Requested key identifier
        key_id: KeyId,
    },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SecurityError {
    /// Metric label for rejection counters.
    pub fn reason_label(&self) -> &'static str {
        match self {
            Self::MalformedHeader(_) => "malformed_header",
            Self::InvalidKeyLength { .. } => "invalid_key_length",
            Self::InvalidInstallCode(_) => "install_code",
            Self::Replay { .. } => "replay",
            Self::CounterExhausted => "counter_exhausted",
            Self::AuthFailure => "auth_failure",
            Self::CertificateInvalid(_) => "certificate_invalid",
            Self::CurveMismatch => "curve_mismatch",
            Self::MalformedInput(_) => "malformed_input",
            Self::SignatureInvalid => "signature_invalid",
            Self::UnsupportedSuite(_) => "unsupported_suite",
            Self::KeyNotFound { .. } => "key_not_found",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<CryptoError> for SecurityError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::AuthenticationFailed => Self::AuthFailure,
            CryptoError::SignatureVerificationFailed => Self::SignatureInvalid,
            CryptoError::InvalidKeyLength { actual, .. } => Self::InvalidKeyLength { actual },
            CryptoError::InvalidPoint
            | CryptoError::PointAtInfinity
            | CryptoError::InvalidPrivateKey
            | CryptoError::InvalidScalar => Self::CertificateInvalid(err.to_string()),
            other => Self::MalformedInput(other.to_string()),
        }
    }
}

/// Status returned across the external interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    /// Operation completed
    Success = 0x00,
    /// A parameter was malformed or out of range
    InvalidParameter = 0xA6,
    /// The request names an unsupported curve or suite
    NotSupported = 0xAA,
    /// A security check failed
    SecurityFail = 0xAD,
}

impl StatusCode {
    /// Status for an operation outcome.
    pub fn from_result<T>(result: &Result<T, SecurityError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => Self::from(e),
        }
    }

    /// Raw status value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<&SecurityError> for StatusCode {
    fn from(err: &SecurityError) -> Self {
        match err {
            SecurityError::MalformedHeader(_)
            | SecurityError::InvalidKeyLength { .. }
            | SecurityError::InvalidInstallCode(_)
            | SecurityError::MalformedInput(_)
            | SecurityError::InvalidConfig(_) => Self::InvalidParameter,
            SecurityError::CurveMismatch | SecurityError::UnsupportedSuite(_) => Self::NotSupported,
            SecurityError::Replay { .. }
            | SecurityError::CounterExhausted
            | SecurityError::AuthFailure
            | SecurityError::CertificateInvalid(_)
            | SecurityError::SignatureInvalid
            | SecurityError::KeyNotFound { .. } => Self::SecurityFail,
        }
    }
}
