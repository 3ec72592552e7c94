//! # CCM* Authenticated Encryption
//!
//! CCM* as profiled by IEEE 802.15.4 and Zigbee: AES-128, a 13-byte nonce
//! (so a 2-byte length field), and a MIC of 0, 4, 6, ... 16 bytes. Unlike
//! plain CCM, encryption and authentication can each be switched off.
//!
//! When encryption is off the payload is authenticated as part of the
//! associated data and travels in the clear. When the MIC length is zero
//! the payload is encrypted without authentication.
//!
//! ## Security Properties
//!
//! - MIC comparison is constant-time (`subtle`)
//! - A failed open restores the caller's buffer, so no plaintext escapes

use crate::symmetric::{Block, BlockCipher, SecretKey, BLOCK_SIZE};
use crate::CryptoError;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// CCM* nonce size in bytes.
pub const NONCE_SIZE: usize = 13;

/// Largest MIC in bytes.
pub const MAX_MIC_SIZE: usize = 16;

/// Largest message with a 2-byte length field.
pub const MAX_MESSAGE_SIZE: usize = 0xFFFF;

/// Largest associated data that fits the short `l(a)` encoding.
pub const MAX_AAD_SIZE: usize = 0xFEFF;

/// `L - 1` for the 2-byte length field.
const LENGTH_FLAG: u8 = 0x01;

/// CCM* nonce.
pub type Nonce = [u8; NONCE_SIZE];

/// Message integrity code of up to 16 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Mic {
    bytes: [u8; MAX_MIC_SIZE],
    len: usize,
}

impl Mic {
    /// Create from a received MIC.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidMicLength` for lengths CCM* does not allow.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if !is_valid_mic_len(bytes.len()) {
            return Err(CryptoError::InvalidMicLength(bytes.len()));
        }
        let mut mic = Self {
            bytes: [0u8; MAX_MIC_SIZE],
            len: bytes.len(),
        };
        mic.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(mic)
    }

    /// MIC bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// MIC length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for the zero-length MIC of unauthenticated levels.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for Mic {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for Mic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mic(")?;
        for b in self.as_slice() {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}

/// True if `len` is a MIC length CCM* permits.
pub fn is_valid_mic_len(len: usize) -> bool {
    len == 0 || ((4..=MAX_MIC_SIZE).contains(&len) && len % 2 == 0)
}

/// CCM* instance bound to one key and MIC length.
#[derive(Clone, Debug)]
pub struct CcmStar {
    cipher: BlockCipher,
    mic_len: usize,
}

impl CcmStar {
    /// Create a CCM* instance.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidMicLength` unless `mic_len` is 0 or an
    /// even value in 4..=16.
    pub fn new(key: &SecretKey, mic_len: usize) -> Result<Self, CryptoError> {
        if !is_valid_mic_len(mic_len) {
            return Err(CryptoError::InvalidMicLength(mic_len));
        }
        Ok(Self {
            cipher: BlockCipher::new(key),
            mic_len,
        })
    }

    /// Configured MIC length.
    pub fn mic_len(&self) -> usize {
        self.mic_len
    }

    /// Protect `payload` in place and return the MIC.
    ///
    /// With `encrypt == false` the payload is left untouched and covered by
    /// the MIC together with `aad`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MessageTooLong` if the input exceeds the CCM*
    /// length fields.
    pub fn seal_in_place(
        &self,
        nonce: &Nonce,
        aad: &[u8],
        payload: &mut [u8],
        encrypt: bool,
    ) -> Result<Mic, CryptoError> {
        check_lengths(aad, payload, encrypt)?;

        let tag = if encrypt {
            self.cbc_mac(nonce, &[aad], payload)
        } else {
            self.cbc_mac(nonce, &[aad, payload], &[])
        };
        if encrypt {
            self.apply_keystream(nonce, payload);
        }

        Ok(self.mask_tag(nonce, &tag))
    }

    /// Verify and (if `encrypted`) decrypt `payload` in place.
    ///
    /// On failure `payload` holds exactly what it held on entry.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::AuthenticationFailed` if the MIC has the wrong
    /// length or does not verify, `CryptoError::MessageTooLong` if the input
    /// exceeds the CCM* length fields.
    pub fn open_in_place(
        &self,
        nonce: &Nonce,
        aad: &[u8],
        payload: &mut [u8],
        mic: &[u8],
        encrypted: bool,
    ) -> Result<(), CryptoError> {
        if mic.len() != self.mic_len {
            return Err(CryptoError::AuthenticationFailed);
        }
        check_lengths(aad, payload, encrypted)?;

        if encrypted {
            self.apply_keystream(nonce, payload);
        }
        let tag = if encrypted {
            self.cbc_mac(nonce, &[aad], payload)
        } else {
            self.cbc_mac(nonce, &[aad, payload], &[])
        };
        let expected = self.mask_tag(nonce, &tag);

        if bool::from(expected.as_slice().ct_eq(mic)) {
            Ok(())
        } else {
            if encrypted {
                self.apply_keystream(nonce, payload);
            }
            Err(CryptoError::AuthenticationFailed)
        }
    }

    /// Allocating variant of [`CcmStar::seal_in_place`]; returns `(body, mic)`.
    ///
    /// # Errors
    ///
    /// See [`CcmStar::seal_in_place`].
    pub fn seal(
        &self,
        nonce: &Nonce,
        aad: &[u8],
        payload: &[u8],
        encrypt: bool,
    ) -> Result<(Vec<u8>, Mic), CryptoError> {
        let mut body = payload.to_vec();
        let mic = self.seal_in_place(nonce, aad, &mut body, encrypt)?;
        Ok((body, mic))
    }

    /// Allocating variant of [`CcmStar::open_in_place`].
    ///
    /// # Errors
    ///
    /// See [`CcmStar::open_in_place`].
    pub fn open(
        &self,
        nonce: &Nonce,
        aad: &[u8],
        body: &[u8],
        mic: &[u8],
        encrypted: bool,
    ) -> Result<Vec<u8>, CryptoError> {
        let mut payload = body.to_vec();
        self.open_in_place(nonce, aad, &mut payload, mic, encrypted)?;
        Ok(payload)
    }

    /// CBC-MAC over `B_0`, the length-prefixed associated data, and the
    /// message, each zero-padded to a block boundary.
    fn cbc_mac(&self, nonce: &Nonce, aad_parts: &[&[u8]], message: &[u8]) -> Block {
        let aad_len: usize = aad_parts.iter().map(|part| part.len()).sum();

        let mut b0 = [0u8; BLOCK_SIZE];
        b0[0] = LENGTH_FLAG;
        if aad_len > 0 {
            b0[0] |= 0x40;
        }
        if self.mic_len > 0 {
            b0[0] |= (((self.mic_len - 2) / 2) as u8) << 3;
        }
        b0[1..=NONCE_SIZE].copy_from_slice(nonce);
        b0[14..].copy_from_slice(&(message.len() as u16).to_be_bytes());

        let mut mac = CbcMac::new(&self.cipher, &b0);
        if aad_len > 0 {
            mac.absorb(&(aad_len as u16).to_be_bytes());
            for part in aad_parts {
                mac.absorb(part);
            }
            mac.pad();
        }
        mac.absorb(message);
        mac.pad();
        mac.finish()
    }

    fn counter_block(&self, nonce: &Nonce, counter: u16) -> Block {
        let mut a = [0u8; BLOCK_SIZE];
        a[0] = LENGTH_FLAG;
        a[1..=NONCE_SIZE].copy_from_slice(nonce);
        a[14..].copy_from_slice(&counter.to_be_bytes());
        self.cipher.encrypt(&a)
    }

    fn apply_keystream(&self, nonce: &Nonce, data: &mut [u8]) {
        for (i, chunk) in data.chunks_mut(BLOCK_SIZE).enumerate() {
            let mut stream = self.counter_block(nonce, (i + 1) as u16);
            for (d, s) in chunk.iter_mut().zip(stream.iter()) {
                *d ^= s;
            }
            stream.zeroize();
        }
    }

    fn mask_tag(&self, nonce: &Nonce, tag: &Block) -> Mic {
        let s0 = self.counter_block(nonce, 0);
        let mut mic = Mic {
            bytes: [0u8; MAX_MIC_SIZE],
            len: self.mic_len,
        };
        for i in 0..self.mic_len {
            mic.bytes[i] = tag[i] ^ s0[i];
        }
        mic
    }
}

fn check_lengths(aad: &[u8], payload: &[u8], encrypt: bool) -> Result<(), CryptoError> {
    let (aad_len, message_len) = if encrypt {
        (aad.len(), payload.len())
    } else {
        (aad.len() + payload.len(), 0)
    };
    if aad_len > MAX_AAD_SIZE {
        return Err(CryptoError::MessageTooLong {
            max: MAX_AAD_SIZE,
            actual: aad_len,
        });
    }
    if message_len > MAX_MESSAGE_SIZE {
        return Err(CryptoError::MessageTooLong {
            max: MAX_MESSAGE_SIZE,
            actual: message_len,
        });
    }
    Ok(())
}

/// Byte-oriented CBC-MAC accumulator.
struct CbcMac<'a> {
    cipher: &'a BlockCipher,
    state: Block,
    pos: usize,
}

impl<'a> CbcMac<'a> {
    fn new(cipher: &'a BlockCipher, b0: &Block) -> Self {
        Self {
            cipher,
            state: cipher.encrypt(b0),
            pos: 0,
        }
    }

    fn absorb(&mut self, data: &[u8]) {
        for &byte in data {
            self.state[self.pos] ^= byte;
            self.pos += 1;
            if self.pos == BLOCK_SIZE {
                self.cipher.encrypt_block(&mut self.state);
                self.pos = 0;
            }
        }
    }

    fn pad(&mut self) {
        if self.pos > 0 {
            self.cipher.encrypt_block(&mut self.state);
            self.pos = 0;
        }
    }

    fn finish(self) -> Block {
        self.state
    }
}
