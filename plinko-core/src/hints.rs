//! Client hint engine.
//!
//! Offline, the client streams the snapshot once and folds every entry
//! into the parity of the primary hint slot named by the iPRF; a
//! second pass charges randomly drawn backup sets. Online, a query
//! consumes one unused hint containing the target, the server answers
//! with the parity of the punctured set, and the target value is the
//! XOR of that parity with the stored hint parity. Updates cost one
//! iPRF call plus a reverse-index lookup.

use crate::entry::{xor_entry, Entry, ZERO_ENTRY};
use crate::error::PirError;
use crate::iprf::{Iprf, PrpKind};
use crate::keys::MasterSecret;
use rand::RngCore;
use std::collections::{HashMap, HashSet};

/// Primary hint slot `j`: parity over the iPRF preimage set
/// `F^-1(j)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrimaryHint {
    pub parity: Entry,
    pub used: bool,
}

/// Backup hint: an explicit random index set and its parity. Backup
/// sets are drawn without replacement and need not be structured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupHint {
    pub indices: Vec<u64>,
    pub parity: Entry,
    pub used: bool,
}

/// Which hint satisfied a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HintSource {
    Primary { slot: u64 },
    Backup { slot: usize },
}

/// A consumed hint plus everything needed to finish the retrieval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPlan {
    target: u64,
    indices: Vec<u64>,
    parity: Entry,
    pub source: HintSource,
}

impl QueryPlan {
    /// The hint's full defining set; always contains the target.
    pub fn indices(&self) -> &[u64] {
        &self.indices
    }

    /// The index set sent to the server: the defining set with the
    /// target punctured out.
    pub fn request_indices(&self) -> Vec<u64> {
        self.indices
            .iter()
            .copied()
            .filter(|&index| index != self.target)
            .collect()
    }

    /// Recover the target entry from the server's parity over
    /// [`request_indices`](Self::request_indices).
    pub fn reconstruct(&self, server_parity: Entry) -> Entry {
        let mut value = self.parity;
        xor_entry(&mut value, &server_parity);
        value
    }
}

pub struct HintClient {
    iprf: Iprf,
    primary: Vec<PrimaryHint>,
    backups: Vec<BackupHint>,
    /// index -> backup slots whose set contains it, in slot order.
    backup_lookup: HashMap<u64, Vec<usize>>,
    num_entries: u64,
    num_hints: u64,
}

impl HintClient {
    /// Allocate `num_hints` zeroed primary slots over a database of
    /// `num_entries` records, with subkeys derived from `master`.
    pub fn new(
        master: &MasterSecret,
        num_entries: u64,
        num_hints: u64,
        kind: PrpKind,
    ) -> Result<Self, PirError> {
        if num_entries == 0 {
            return Err(PirError::InvalidParams("num_entries must be > 0"));
        }
        if num_hints == 0 {
            return Err(PirError::InvalidParams("num_hints must be > 0"));
        }

        Ok(Self {
            iprf: Iprf::from_master(master, num_entries, num_hints, kind),
            primary: vec![
                PrimaryHint {
                    parity: ZERO_ENTRY,
                    used: false,
                };
                num_hints as usize
            ],
            backups: Vec::new(),
            backup_lookup: HashMap::new(),
            num_entries,
            num_hints,
        })
    }

    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    pub fn num_hints(&self) -> u64 {
        self.num_hints
    }

    pub fn iprf(&self) -> &Iprf {
        &self.iprf
    }

    pub fn primary_hints(&self) -> &[PrimaryHint] {
        &self.primary
    }

    pub fn backup_hints(&self) -> &[BackupHint] {
        &self.backups
    }

    pub fn remaining_backups(&self) -> usize {
        self.backups.iter().filter(|b| !b.used).count()
    }

    /// Offline primary pass. The stream must cover `[0, num_entries)`
    /// exactly once, in any order; a stream that ends early fails with
    /// `StreamTruncated` and the partial slots must be discarded by
    /// rebuilding.
    pub fn build_hints<I>(&mut self, stream: I) -> Result<(), PirError>
    where
        I: IntoIterator<Item = (u64, Entry)>,
    {
        for slot in self.primary.iter_mut() {
            slot.parity = ZERO_ENTRY;
            slot.used = false;
        }

        let mut seen = 0u64;
        for (index, value) in stream {
            if index >= self.num_entries {
                return Err(PirError::Domain {
                    bound: self.num_entries,
                });
            }
            let slot = self.iprf.forward(index)?;
            xor_entry(&mut self.primary[slot as usize].parity, &value);
            seen += 1;
        }

        if seen < self.num_entries {
            return Err(PirError::StreamTruncated {
                expected: self.num_entries,
                seen,
            });
        }
        Ok(())
    }

    /// Offline backup pass: draw `count` sets of `set_size` distinct
    /// indices from `rng`, then stream the snapshot once and fold each
    /// entry into every backup set containing it. The reverse index
    /// built here also serves the update path.
    pub fn build_backups<I, R>(
        &mut self,
        count: usize,
        set_size: usize,
        stream: I,
        rng: &mut R,
    ) -> Result<(), PirError>
    where
        I: IntoIterator<Item = (u64, Entry)>,
        R: RngCore + ?Sized,
    {
        if set_size == 0 || set_size as u64 > self.num_entries {
            return Err(PirError::InvalidParams(
                "backup set size must be in [1, num_entries]",
            ));
        }

        self.backups = Vec::with_capacity(count);
        self.backup_lookup = HashMap::new();
        for slot in 0..count {
            let indices = draw_distinct_indices(rng, set_size, self.num_entries);
            for &index in &indices {
                self.backup_lookup.entry(index).or_default().push(slot);
            }
            self.backups.push(BackupHint {
                indices,
                parity: ZERO_ENTRY,
                used: false,
            });
        }

        let mut seen = 0u64;
        for (index, value) in stream {
            if index >= self.num_entries {
                return Err(PirError::Domain {
                    bound: self.num_entries,
                });
            }
            if let Some(slots) = self.backup_lookup.get(&index) {
                for &slot in slots {
                    xor_entry(&mut self.backups[slot].parity, &value);
                }
            }
            seen += 1;
        }

        if seen < self.num_entries {
            return Err(PirError::StreamTruncated {
                expected: self.num_entries,
                seen,
            });
        }
        Ok(())
    }

    /// Consume an unused hint covering `target`: the primary slot
    /// `F(target)` if still fresh, otherwise the first unused backup
    /// whose set contains the target. A hint whose set misses the
    /// target is never an answer; naming such a set on the wire would
    /// reveal the target, so exhaustion fails with `OutOfHints`.
    pub fn query(&mut self, target: u64) -> Result<QueryPlan, PirError> {
        if target >= self.num_entries {
            return Err(PirError::Domain {
                bound: self.num_entries,
            });
        }

        let slot = self.iprf.forward(target)?;
        if !self.primary[slot as usize].used {
            let parity = self.primary[slot as usize].parity;
            self.primary[slot as usize].used = true;
            return Ok(QueryPlan {
                target,
                indices: self.iprf.inverse(slot)?,
                parity,
                source: HintSource::Primary { slot },
            });
        }

        if let Some(slots) = self.backup_lookup.get(&target) {
            for &backup_slot in slots {
                if self.backups[backup_slot].used {
                    continue;
                }
                self.backups[backup_slot].used = true;
                return Ok(QueryPlan {
                    target,
                    indices: self.backups[backup_slot].indices.clone(),
                    parity: self.backups[backup_slot].parity,
                    source: HintSource::Backup { slot: backup_slot },
                });
            }
        }

        Err(PirError::OutOfHints)
    }

    /// Apply one `(index, delta)` database change, `delta = old ^ new`.
    ///
    /// The primary slot is charged unconditionally: a consumed slot is
    /// never read again, and an unconsumed one must reflect the new
    /// value when it is eventually queried.
    pub fn update(&mut self, index: u64, delta: Entry) -> Result<(), PirError> {
        if index >= self.num_entries {
            return Err(PirError::Domain {
                bound: self.num_entries,
            });
        }

        let slot = self.iprf.forward(index)?;
        xor_entry(&mut self.primary[slot as usize].parity, &delta);

        if let Some(slots) = self.backup_lookup.get(&index) {
            for &backup_slot in slots {
                xor_entry(&mut self.backups[backup_slot].parity, &delta);
            }
        }
        Ok(())
    }

    /// Apply a delta stream in arrival order.
    pub fn apply_deltas<I>(&mut self, deltas: I) -> Result<(), PirError>
    where
        I: IntoIterator<Item = (u64, Entry)>,
    {
        for (index, delta) in deltas {
            self.update(index, delta)?;
        }
        Ok(())
    }
}

/// Uniform draw below `bound` by rejection; plain `next_u64() % bound`
/// would bias non-power-of-two bounds.
fn uniform_below<R: RngCore + ?Sized>(rng: &mut R, bound: u64) -> u64 {
    debug_assert!(bound > 0);
    if bound == 1 {
        return 0;
    }
    if bound.is_power_of_two() {
        return rng.next_u64() & (bound - 1);
    }
    let threshold = u64::MAX - (u64::MAX % bound);
    loop {
        let v = rng.next_u64();
        if v < threshold {
            return v % bound;
        }
    }
}

/// `set_size` distinct indices drawn uniformly from `[0, bound)`.
fn draw_distinct_indices<R: RngCore + ?Sized>(
    rng: &mut R,
    set_size: usize,
    bound: u64,
) -> Vec<u64> {
    let mut chosen = HashSet::with_capacity(set_size);
    let mut indices = Vec::with_capacity(set_size);
    while indices.len() < set_size {
        let index = uniform_below(rng, bound);
        if chosen.insert(index) {
            indices.push(index);
        }
    }
    indices
}
