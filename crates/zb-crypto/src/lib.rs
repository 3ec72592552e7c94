//! # Zigbee Crypto - Link-Layer Cryptographic Primitives
//!
//! Everything the security subsystem needs below the frame level. Nothing in
//! this crate knows about Zigbee frames, addresses, or key stores.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | AES-128 | Block cipher for every other primitive |
//! | `hashing` | AES-MMO, HMAC-AES-MMO | Install codes, key derivation, certificate digests |
//! | `ccm` | CCM* | Frame authentication and encryption |
//! | `ecc` | sect163k1, sect283k1 | CBKE certificates, ECDH, ECMQV |
//! | `ecdsa` | ECDSA over Koblitz curves | OTA image signatures |
//!
//! ## Security Properties
//!
//! - **CCM\***: MIC comparison is constant-time, no plaintext is released on failure
//! - **Keys**: 128-bit key material and private scalars are zeroized on drop
//! - **ECC**: scalar multiplication runs a uniform add/double ladder per bit

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ccm;
pub mod ecc;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod symmetric;

// Re-exports
pub use ccm::{CcmStar, Mic, NONCE_SIZE};
pub use ecc::{
    Point, PrivateKey, Scalar, Sect163k1, Sect283k1, SharedSecret, ZigbeeCurve,
};
pub use ecdsa::{EcdsaSignature, EcdsaSigner, EcdsaVerifier};
pub use errors::CryptoError;
pub use hashing::{aes_mmo_hash, hmac_aes_mmo, AesMmoHasher, Digest, DIGEST_SIZE};
pub use symmetric::{BlockCipher, SecretKey, BLOCK_SIZE, KEY_SIZE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
