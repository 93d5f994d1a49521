//! Server-side query handler.
//!
//! A stateless computation over the partitioned snapshot: the database
//! is read-only while queries are served, so independent queries can
//! run in parallel. The structured answer reveals nothing beyond the
//! `(p, offsets)` shape the client chose.

use crate::db::{Database, PartitionParams};
use crate::entry::{xor_entry, Entry, ZERO_ENTRY};
use crate::error::PirError;

/// Structured query: a subset `p` of chunk IDs plus one offset per
/// chunk. Offsets are reduced mod `chunk_size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuredQuery {
    pub p: Vec<u64>,
    pub offsets: Vec<u64>,
}

/// Two parities: `r0` over the chunks named in `p`, `r1` over the
/// rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StructuredResponse {
    pub r0: Entry,
    pub r1: Entry,
}

pub struct Server {
    entries: Vec<Entry>,
    params: PartitionParams,
}

impl Server {
    pub fn new(entries: Vec<Entry>) -> Result<Self, PirError> {
        if entries.is_empty() {
            return Err(PirError::InvalidParams("database must not be empty"));
        }
        let params = PartitionParams::derive(entries.len() as u64);
        Ok(Self { entries, params })
    }

    pub fn from_database(db: &Database) -> Result<Self, PirError> {
        Self::new(db.stream().map(|(_, entry)| entry).collect())
    }

    pub fn params(&self) -> PartitionParams {
        self.params
    }

    pub fn num_entries(&self) -> u64 {
        self.params.num_entries
    }

    /// Direct lookup; debug transport only.
    pub fn plaintext(&self, index: u64) -> Result<Entry, PirError> {
        self.entries
            .get(index as usize)
            .copied()
            .ok_or(PirError::Domain {
                bound: self.params.num_entries,
            })
    }

    /// Parity of an explicit index set.
    pub fn set_parity(&self, indices: &[u64]) -> Result<Entry, PirError> {
        let mut parity = ZERO_ENTRY;
        for &index in indices {
            let entry = self
                .entries
                .get(index as usize)
                .ok_or(PirError::Domain {
                    bound: self.params.num_entries,
                })?;
            xor_entry(&mut parity, entry);
        }
        Ok(parity)
    }

    /// Answer a structured query. The query names one slot per chunk;
    /// slots in the padding tail past the last real entry read as
    /// zero. Shape violations are rejected before any work.
    pub fn answer(&self, query: &StructuredQuery) -> Result<StructuredResponse, PirError> {
        let set_size = self.params.set_size;
        if query.offsets.len() as u64 != set_size {
            return Err(PirError::QueryMalformed(
                "offset list length must equal the chunk count",
            ));
        }

        let mut in_p = vec![false; set_size as usize];
        for &chunk in &query.p {
            if chunk >= set_size {
                return Err(PirError::QueryMalformed("chunk id out of range"));
            }
            in_p[chunk as usize] = true;
        }

        let mut r0 = ZERO_ENTRY;
        let mut r1 = ZERO_ENTRY;
        for chunk in 0..set_size {
            let offset = query.offsets[chunk as usize] % self.params.chunk_size;
            let index = chunk * self.params.chunk_size + offset;
            let entry = self
                .entries
                .get(index as usize)
                .copied()
                .unwrap_or(ZERO_ENTRY);

            if in_p[chunk as usize] {
                xor_entry(&mut r0, &entry);
            } else {
                xor_entry(&mut r1, &entry);
            }
        }

        Ok(StructuredResponse { r0, r1 })
    }
}
