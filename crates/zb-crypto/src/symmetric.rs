//! # Symmetric Primitives
//!
//! AES-128 is the only block cipher in the Zigbee security suite. Every
//! other primitive (AES-MMO, HMAC, CCM*) is built on [`BlockCipher`].

use crate::CryptoError;
use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// AES-128 key size in bytes.
pub const KEY_SIZE: usize = 16;

/// One cipher block.
pub type Block = [u8; BLOCK_SIZE];

/// Secret key (128-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice that must be exactly 16 bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(key))
    }

    /// Generate random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// AES-128 block encryption with an expanded key schedule.
///
/// Zigbee only ever runs AES in the forward direction (CTR and CBC-MAC in
/// CCM*, Matyas-Meyer-Oseas in AES-MMO), so no decryption is exposed.
#[derive(Clone)]
pub struct BlockCipher {
    cipher: Aes128,
}

impl BlockCipher {
    /// Expand the key schedule for `key`.
    pub fn new(key: &SecretKey) -> Self {
        Self::from_bytes(key.as_bytes())
    }

    /// Expand the key schedule for raw key bytes.
    pub fn from_bytes(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(key)),
        }
    }

    /// Encrypt one block in place.
    pub fn encrypt_block(&self, block: &mut Block) {
        self.cipher
            .encrypt_block(GenericArray::from_mut_slice(block.as_mut_slice()));
    }

    /// Encrypt one block, returning the ciphertext.
    pub fn encrypt(&self, block: &Block) -> Block {
        let mut out = *block;
        self.encrypt_block(&mut out);
        out
    }
}

impl fmt::Debug for BlockCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlockCipher(AES-128)")
    }
}
