//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Invalid nonce length
    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Expected nonce length in bytes
        expected: usize,
        /// Actual nonce length in bytes
        actual: usize,
    },

    /// MIC length not permitted by CCM*
    #[error("Invalid MIC length: {0}")]
    InvalidMicLength(usize),

    /// Message does not fit the 16-bit CCM* length field
    #[error("Message too long: {actual} bytes exceeds {max}")]
    MessageTooLong {
        /// Largest accepted length in bytes
        max: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// MIC did not verify
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Encoded point is not on the curve or has the wrong length
    #[error("Invalid curve point")]
    InvalidPoint,

    /// Operation produced the point at infinity
    #[error("Point at infinity")]
    PointAtInfinity,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Scalar is zero or not below the group order
    #[error("Invalid scalar")]
    InvalidScalar,

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid input for cryptographic operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
