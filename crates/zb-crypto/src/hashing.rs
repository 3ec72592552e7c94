//! # AES-MMO Hashing
//!
//! Matyas-Meyer-Oseas compression over AES-128 with a zero IV, as used for
//! install-code keys, CBKE certificate digests and OTA image digests.
//!
//! Each block `M_i` is encrypted under the running hash and fed forward:
//! `H_i = E(H_{i-1}, M_i) ^ M_i`.

use crate::symmetric::{Block, BlockCipher, BLOCK_SIZE};
use zeroize::Zeroize;

/// AES-MMO digest size in bytes.
pub const DIGEST_SIZE: usize = 16;

/// AES-MMO digest.
pub type Digest = [u8; DIGEST_SIZE];

/// Messages of at least this many bits use the 32-bit length trailer.
const SHORT_MESSAGE_BITS: u64 = 1 << 16;

const HMAC_IPAD: u8 = 0x36;
const HMAC_OPAD: u8 = 0x5c;

/// Streaming AES-MMO hasher.
#[derive(Clone)]
pub struct AesMmoHasher {
    state: Block,
    buffer: Block,
    buffered: usize,
    total_len: u64,
}

impl AesMmoHasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            state: [0u8; BLOCK_SIZE],
            buffer: [0u8; BLOCK_SIZE],
            buffered: 0,
            total_len: 0,
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.total_len = self.total_len.wrapping_add(data.len() as u64);

        let mut input = data;
        if self.buffered > 0 {
            let take = (BLOCK_SIZE - self.buffered).min(input.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&input[..take]);
            self.buffered += take;
            input = &input[take..];

            if self.buffered < BLOCK_SIZE {
                return self;
            }
            let block = self.buffer;
            self.compress(&block);
            self.buffered = 0;
        }

        let mut chunks = input.chunks_exact(BLOCK_SIZE);
        for chunk in &mut chunks {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            self.compress(&block);
        }

        let rest = chunks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffered = rest.len();
        self
    }

    /// Finalize and return the digest.
    ///
    /// The message is padded with `0x80`, zeros, and its bit length: a
    /// 16-bit big-endian trailer below 2^16 bits, otherwise a 32-bit
    /// trailer followed by two zero bytes.
    pub fn finalize(mut self) -> Digest {
        let bit_len = self.total_len.wrapping_mul(8);

        let mut tail = [0u8; 2 * BLOCK_SIZE];
        let mut len = self.buffered;
        tail[..len].copy_from_slice(&self.buffer[..len]);
        tail[len] = 0x80;
        len += 1;

        if bit_len < SHORT_MESSAGE_BITS {
            while len % BLOCK_SIZE != BLOCK_SIZE - 2 {
                len += 1;
            }
            tail[len..len + 2].copy_from_slice(&(bit_len as u16).to_be_bytes());
            len += 2;
        } else {
            while len % BLOCK_SIZE != BLOCK_SIZE - 6 {
                len += 1;
            }
            tail[len..len + 4].copy_from_slice(&(bit_len as u32).to_be_bytes());
            len += 6;
        }

        for chunk in tail[..len].chunks_exact(BLOCK_SIZE) {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            self.compress(&block);
        }

        let digest = self.state;
        self.reset();
        tail.zeroize();
        digest
    }

    /// Reset to the initial (zero IV) state.
    pub fn reset(&mut self) {
        self.state.zeroize();
        self.buffer.zeroize();
        self.buffered = 0;
        self.total_len = 0;
    }

    fn compress(&mut self, block: &Block) {
        let mut out = BlockCipher::from_bytes(&self.state).encrypt(block);
        for (o, m) in out.iter_mut().zip(block.iter()) {
            *o ^= m;
        }
        self.state = out;
    }
}

impl Default for AesMmoHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the AES-MMO hash of data (one-shot).
pub fn aes_mmo_hash(data: &[u8]) -> Digest {
    let mut hasher = AesMmoHasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// HMAC over AES-MMO (block and digest size 16).
///
/// Keys longer than one block are hashed first.
pub fn hmac_aes_mmo(key: &[u8], data: &[u8]) -> Digest {
    let mut key_block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        key_block = aes_mmo_hash(key);
    } else {
        key_block[..key.len()].copy_from_slice(key);
    }

    let mut pad = [0u8; BLOCK_SIZE];
    for (p, k) in pad.iter_mut().zip(key_block.iter()) {
        *p = k ^ HMAC_IPAD;
    }
    let mut inner = AesMmoHasher::new();
    inner.update(&pad).update(data);
    let inner_digest = inner.finalize();

    for (p, k) in pad.iter_mut().zip(key_block.iter()) {
        *p = k ^ HMAC_OPAD;
    }
    let mut outer = AesMmoHasher::new();
    outer.update(&pad).update(&inner_digest);

    key_block.zeroize();
    pad.zeroize();
    outer.finalize()
}
