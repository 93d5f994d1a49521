//! AES-128 block PRF.
//!
//! A single keyed AES-128 instance is the only source of protocol
//! randomness: PRP round functions, PMNS binomial draws, and the
//! table-shuffle keystream all reduce to encrypting a domain-separated
//! 128-bit input. Inputs are encoded big-endian so outputs are
//! bit-identical across implementations.

use crate::keys::PrfKey128;
use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};

/// Keyed AES-128 used as a PRF over pairs of u64.
pub struct BlockPrf {
    cipher: Aes128,
}

impl BlockPrf {
    pub fn new(key: PrfKey128) -> Self {
        Self {
            cipher: Aes128::new(&GenericArray::from(key)),
        }
    }

    /// Encrypt the block `hi ‖ lo` (both big-endian u64).
    pub fn eval(&self, hi: u64, lo: u64) -> [u8; 16] {
        let mut input = [0u8; 16];
        input[0..8].copy_from_slice(&hi.to_be_bytes());
        input[8..16].copy_from_slice(&lo.to_be_bytes());
        let mut block = GenericArray::from(input);
        self.cipher.encrypt_block(&mut block);
        block.into()
    }

    /// First 8 ciphertext bytes of [`eval`](Self::eval) as a
    /// big-endian u64.
    pub fn eval_u64(&self, hi: u64, lo: u64) -> u64 {
        let out = self.eval(hi, lo);
        u64::from_be_bytes(out[0..8].try_into().unwrap())
    }
}

/// Deterministic AES-CTR randomness stream.
///
/// Drives the Fisher-Yates shuffle of the table permutation; the same
/// key always produces the same stream.
pub struct AesCtrRng {
    cipher: ctr::Ctr128BE<Aes128>,
    buf: [u8; 64],
    idx: usize,
}

impl AesCtrRng {
    pub fn new(key: PrfKey128) -> Self {
        let iv = [0u8; 16];
        Self {
            cipher: ctr::Ctr128BE::<Aes128>::new(&key.into(), &iv.into()),
            buf: [0u8; 64],
            idx: 64,
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        if self.idx + 8 > self.buf.len() {
            self.buf = [0u8; 64];
            self.cipher.apply_keystream(&mut self.buf);
            self.idx = 0;
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buf[self.idx..self.idx + 8]);
        self.idx += 8;
        u64::from_be_bytes(bytes)
    }

    /// Uniform draw in `[0, bound)` by rejection sampling. A plain
    /// `next_u64() % bound` would bias non-power-of-two bounds.
    pub fn next_below(&mut self, bound: u64) -> u64 {
        if bound <= 1 {
            return 0;
        }
        if bound.is_power_of_two() {
            return self.next_u64() & (bound - 1);
        }
        let threshold = u64::MAX - (u64::MAX % bound);
        loop {
            let v = self.next_u64();
            if v < threshold {
                return v % bound;
            }
        }
    }
}
