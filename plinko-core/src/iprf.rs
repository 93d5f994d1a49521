//! Invertible pseudorandom function.
//!
//! `F(x) = S(P(x))`: a small-domain permutation followed by the
//! multinomial sampler. The permutation makes preimage sets
//! pseudorandom subsets of `[0, n)`; the sampler gives each output bin
//! an efficiently enumerable, contiguous permuted range. Inverting
//! maps that range back through `P^-1`.

use crate::error::PirError;
use crate::keys::{MasterSecret, PrfKey128, CONTEXT_PMNS, CONTEXT_PRP};
use crate::pmns::Pmns;
use crate::prp::{FeistelPrp, Prp, TablePrp};

/// Permutation backend selector. Both choices satisfy the same
/// contract; the table costs O(n) memory for O(1) lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrpKind {
    Feistel,
    Table,
}

pub struct Iprf {
    prp: Prp,
    pmns: Pmns,
    domain: u64,
    range: u64,
}

impl Iprf {
    /// Build from explicit subkeys.
    ///
    /// # Panics
    ///
    /// Panics if `n` or `m` is zero.
    pub fn new(prp_key: PrfKey128, pmns_key: PrfKey128, n: u64, m: u64, kind: PrpKind) -> Self {
        let prp = match kind {
            PrpKind::Feistel => Prp::Feistel(FeistelPrp::new(prp_key, n)),
            PrpKind::Table => Prp::Table(TablePrp::new(prp_key, n)),
        };
        Self {
            prp,
            pmns: Pmns::new(pmns_key, n, m),
            domain: n,
            range: m,
        }
    }

    /// Build with both subkeys derived from the master secret under
    /// their reserved contexts.
    pub fn from_master(master: &MasterSecret, n: u64, m: u64, kind: PrpKind) -> Self {
        Self::new(
            master.derive(CONTEXT_PRP),
            master.derive(CONTEXT_PMNS),
            n,
            m,
            kind,
        )
    }

    pub fn domain(&self) -> u64 {
        self.domain
    }

    pub fn range(&self) -> u64 {
        self.range
    }

    /// `F(x)`: one permutation call plus one sampler descent.
    pub fn forward(&self, x: u64) -> Result<u64, PirError> {
        if x >= self.domain {
            return Err(PirError::Domain { bound: self.domain });
        }
        let permuted = self.prp.permute(x)?;
        self.pmns.forward(permuted)
    }

    /// `F^-1(y)`: the full preimage set, expected size `n/m`. For
    /// every `x` in the domain, `inverse(forward(x))` contains `x`.
    pub fn inverse(&self, y: u64) -> Result<Vec<u64>, PirError> {
        if y >= self.range {
            return Err(PirError::Domain { bound: self.range });
        }
        self.pmns
            .preimage(y)?
            .map(|permuted| self.prp.inverse(permuted))
            .collect()
    }
}
