//! Small-domain pseudorandom permutations.
//!
//! Two interchangeable constructions of a keyed bijection on `[0, n)`:
//!
//! - [`FeistelPrp`]: four rounds of an unbalanced modular-addition
//!   Feistel network over `[0, 2^b)` with `b = ceil(log2 n)`, adapted
//!   to the exact domain by cycle walking. O(1) memory.
//! - [`TablePrp`]: explicit forward/inverse lookup tables built by a
//!   deterministic Fisher-Yates shuffle over an AES-CTR keystream.
//!   O(1) lookups, O(n) memory and init time.
//!
//! The backend is picked at construction time via [`Prp`]; callers see
//! the same `permute`/`inverse` contract either way.

use crate::error::PirError;
use crate::keys::PrfKey128;
use crate::prf::{AesCtrRng, BlockPrf};

/// Luby-Rackoff minimum for PRP security up to the birthday bound.
const FEISTEL_ROUNDS: usize = 4;

/// `ceil(log2 n)` for `n >= 1`.
fn domain_bits(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        64 - (n - 1).leading_zeros()
    }
}

fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Unbalanced Feistel network with cycle walking.
///
/// A value in `[0, 2^b)` splits into `(left, right)` halves of widths
/// `(b - b/2, b/2)`. Modular addition keeps the rounds invertible even
/// when the halves differ in width, which a plain XOR-and-swap Feistel
/// would not.
pub struct FeistelPrp {
    prf: BlockPrf,
    domain: u64,
    left_bits: u32,
    right_bits: u32,
}

impl FeistelPrp {
    /// # Panics
    ///
    /// Panics if `domain` is zero.
    pub fn new(key: PrfKey128, domain: u64) -> Self {
        assert!(domain > 0, "FeistelPrp domain must be positive");
        let bits = domain_bits(domain);
        let right_bits = bits / 2;
        Self {
            prf: BlockPrf::new(key),
            domain,
            left_bits: bits - right_bits,
            right_bits,
        }
    }

    pub fn domain(&self) -> u64 {
        self.domain
    }

    pub fn permute(&self, x: u64) -> Result<u64, PirError> {
        if x >= self.domain {
            return Err(PirError::Domain { bound: self.domain });
        }
        // Cycle walking: the network permutes [0, 2^b); re-apply until
        // the output lands back inside [0, domain).
        let mut curr = x;
        loop {
            curr = self.encrypt_block(curr);
            if curr < self.domain {
                return Ok(curr);
            }
        }
    }

    pub fn inverse(&self, y: u64) -> Result<u64, PirError> {
        if y >= self.domain {
            return Err(PirError::Domain { bound: self.domain });
        }
        let mut curr = y;
        loop {
            curr = self.decrypt_block(curr);
            if curr < self.domain {
                return Ok(curr);
            }
        }
    }

    fn encrypt_block(&self, val: u64) -> u64 {
        let mask_left = low_mask(self.left_bits);
        let mask_right = low_mask(self.right_bits);
        let mut right = val & mask_right;
        let mut left = (val >> self.right_bits) & mask_left;

        for round in 0..FEISTEL_ROUNDS as u64 {
            left = left.wrapping_add(self.round_value(right, 2 * round)) & mask_left;
            right = right.wrapping_add(self.round_value(left, 2 * round + 1)) & mask_right;
        }

        (left << self.right_bits) | right
    }

    fn decrypt_block(&self, val: u64) -> u64 {
        let mask_left = low_mask(self.left_bits);
        let mask_right = low_mask(self.right_bits);
        let mut right = val & mask_right;
        let mut left = (val >> self.right_bits) & mask_left;

        for round in (0..FEISTEL_ROUNDS as u64).rev() {
            right = right.wrapping_sub(self.round_value(left, 2 * round + 1)) & mask_right;
            left = left.wrapping_sub(self.round_value(right, 2 * round)) & mask_left;
        }

        (left << self.right_bits) | right
    }

    /// Round function `F(v, r) = AES_k(v ‖ r)`, truncated by the
    /// caller's half-width mask.
    #[inline]
    fn round_value(&self, input: u64, round: u64) -> u64 {
        self.prf.eval_u64(input, round)
    }
}

/// Table-backed permutation.
///
/// A deterministic Fisher-Yates shuffle of the identity permutation,
/// driven by an AES-CTR keystream with rejection-sampled draws, yields
/// the forward table; the inverse table is its pointwise inversion.
pub struct TablePrp {
    domain: u64,
    forward_table: Vec<u64>,
    inverse_table: Vec<u64>,
}

impl TablePrp {
    /// # Panics
    ///
    /// Panics if `domain` is zero.
    pub fn new(key: PrfKey128, domain: u64) -> Self {
        assert!(domain > 0, "TablePrp domain must be positive");

        let mut forward_table: Vec<u64> = (0..domain).collect();
        let mut rng = AesCtrRng::new(key);
        for i in (1..domain).rev() {
            let j = rng.next_below(i + 1);
            forward_table.swap(i as usize, j as usize);
        }

        let mut inverse_table = vec![0u64; domain as usize];
        for (i, &y) in forward_table.iter().enumerate() {
            inverse_table[y as usize] = i as u64;
        }

        Self {
            domain,
            forward_table,
            inverse_table,
        }
    }

    pub fn domain(&self) -> u64 {
        self.domain
    }

    pub fn permute(&self, x: u64) -> Result<u64, PirError> {
        self.forward_table
            .get(x as usize)
            .copied()
            .ok_or(PirError::Domain { bound: self.domain })
    }

    pub fn inverse(&self, y: u64) -> Result<u64, PirError> {
        self.inverse_table
            .get(y as usize)
            .copied()
            .ok_or(PirError::Domain { bound: self.domain })
    }
}

/// Construction-time choice of permutation backend.
pub enum Prp {
    Feistel(FeistelPrp),
    Table(TablePrp),
}

impl Prp {
    pub fn permute(&self, x: u64) -> Result<u64, PirError> {
        match self {
            Self::Feistel(prp) => prp.permute(x),
            Self::Table(prp) => prp.permute(x),
        }
    }

    pub fn inverse(&self, y: u64) -> Result<u64, PirError> {
        match self {
            Self::Feistel(prp) => prp.inverse(y),
            Self::Table(prp) => prp.inverse(y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn feistel_roundtrip() {
        let prp = FeistelPrp::new([0u8; 16], 1000);
        for x in [47u64, 74, 75, 83, 95, 97] {
            let y = prp.permute(x).unwrap();
            assert!(y < 1000);
            assert_eq!(prp.inverse(y).unwrap(), x, "roundtrip failed for x={x}");
        }
    }

    #[test]
    fn feistel_is_permutation() {
        let prp = FeistelPrp::new([1u8; 16], 257);
        let mut outputs: Vec<u64> = (0..257).map(|x| prp.permute(x).unwrap()).collect();
        outputs.sort_unstable();
        outputs.dedup();
        assert_eq!(outputs.len(), 257);
    }

    #[test]
    fn feistel_single_element_domain() {
        let prp = FeistelPrp::new([2u8; 16], 1);
        assert_eq!(prp.permute(0).unwrap(), 0);
        assert_eq!(prp.inverse(0).unwrap(), 0);
    }

    #[test]
    fn feistel_rejects_out_of_domain() {
        let prp = FeistelPrp::new([0u8; 16], 10);
        assert_eq!(prp.permute(10), Err(PirError::Domain { bound: 10 }));
        assert_eq!(prp.inverse(11), Err(PirError::Domain { bound: 10 }));
    }

    #[test]
    fn table_matches_contract_on_ten_thousand() {
        let prp = TablePrp::new(*b"0123456789abcdef", 10_000);

        let mut seen = vec![false; 10_000];
        for x in 0..10_000u64 {
            let y = prp.permute(x).unwrap();
            assert!(!seen[y as usize], "output {y} appears twice");
            seen[y as usize] = true;
            assert_eq!(prp.inverse(y).unwrap(), x);
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn table_rejects_out_of_domain() {
        let prp = TablePrp::new([0u8; 16], 8);
        assert_eq!(prp.permute(8), Err(PirError::Domain { bound: 8 }));
        assert_eq!(prp.inverse(8), Err(PirError::Domain { bound: 8 }));
    }

    #[test]
    fn table_is_deterministic() {
        let a = TablePrp::new([5u8; 16], 100);
        let b = TablePrp::new([5u8; 16], 100);
        for x in 0..100 {
            assert_eq!(a.permute(x).unwrap(), b.permute(x).unwrap());
        }
    }

    #[test]
    fn domain_bits_edges() {
        assert_eq!(domain_bits(1), 0);
        assert_eq!(domain_bits(2), 1);
        assert_eq!(domain_bits(3), 2);
        assert_eq!(domain_bits(4), 2);
        assert_eq!(domain_bits(5), 3);
        assert_eq!(domain_bits(1 << 20), 20);
        assert_eq!(domain_bits((1 << 20) + 1), 21);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn feistel_inverse_roundtrip(
            key in any::<[u8; 16]>(),
            domain in 1u64..10_000,
            x in any::<u64>(),
        ) {
            let x = x % domain;
            let prp = FeistelPrp::new(key, domain);

            let y = prp.permute(x).unwrap();
            prop_assert!(y < domain);
            prop_assert_eq!(prp.inverse(y).unwrap(), x);
        }

        #[test]
        fn table_inverse_roundtrip(
            key in any::<[u8; 16]>(),
            domain in 1u64..2_000,
            x in any::<u64>(),
        ) {
            let x = x % domain;
            let prp = TablePrp::new(key, domain);

            let y = prp.permute(x).unwrap();
            prop_assert!(y < domain);
            prop_assert_eq!(prp.inverse(y).unwrap(), x);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 32,
            .. ProptestConfig::default()
        })]

        #[test]
        fn feistel_bijective_on_small_domains(
            key in any::<[u8; 16]>(),
            domain in 1u64..129,
        ) {
            let prp = FeistelPrp::new(key, domain);
            let mut outputs: Vec<u64> = (0..domain).map(|x| prp.permute(x).unwrap()).collect();
            outputs.sort_unstable();
            outputs.dedup();
            prop_assert_eq!(outputs.len() as u64, domain);
        }
    }
}
