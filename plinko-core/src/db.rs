//! Database snapshots and partition parameters.
//!
//! A snapshot is a flat file of 32-byte records; the entry count is
//! the file size divided by 32. Client and server derive the same
//! partition geometry from that count alone.

use crate::entry::{entry_from_bytes, entry_to_bytes, Entry, ENTRY_SIZE};
use eyre::{ensure, Result};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;

/// Partition geometry: the database is viewed as `set_size` chunks of
/// `chunk_size` consecutive entries, with `chunk_size * set_size >=
/// num_entries` (the tail past `num_entries` reads as zero).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionParams {
    pub num_entries: u64,
    pub chunk_size: u64,
    pub set_size: u64,
}

impl PartitionParams {
    /// Derive the geometry for `num_entries` records.
    ///
    /// `chunk_size` is the smallest power of two at or above
    /// `2 * sqrt(num_entries)`; `set_size` is the matching chunk count
    /// rounded up to a multiple of four. Pure integer arithmetic so
    /// every implementation lands on identical values.
    pub fn derive(num_entries: u64) -> Self {
        if num_entries == 0 {
            return Self {
                num_entries,
                chunk_size: 1,
                set_size: 1,
            };
        }

        let target_chunk = isqrt(4u64.saturating_mul(num_entries));
        let mut chunk_size = 1u64;
        while chunk_size < target_chunk {
            chunk_size = chunk_size.saturating_mul(2);
        }

        let set_size = num_entries.div_ceil(chunk_size).div_ceil(4) * 4;

        Self {
            num_entries,
            chunk_size,
            set_size,
        }
    }

    /// Total addressable slots including the zero-padded tail.
    pub fn capacity(&self) -> u64 {
        self.chunk_size * self.set_size
    }

    #[inline]
    pub fn chunk_of(&self, index: u64) -> u64 {
        index / self.chunk_size
    }

    #[inline]
    pub fn offset_of(&self, index: u64) -> u64 {
        index % self.chunk_size
    }
}

/// `floor(sqrt(n))` by Newton iteration from an over-estimate.
fn isqrt(n: u64) -> u64 {
    if n <= 1 {
        return n;
    }
    let bits = 64 - n.leading_zeros();
    let mut x = 1u64 << bits.div_ceil(2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Memory-mapped snapshot file. Read-only at query time; the update
/// path rewrites records in place and flushes.
pub struct Database {
    mmap: MmapMut,
    params: PartitionParams,
}

impl Database {
    /// Map the snapshot at `path`. Fails if the file size is not a
    /// whole number of records.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())?;
        let len = file.metadata()?.len();

        ensure!(
            len % ENTRY_SIZE as u64 == 0,
            "snapshot size {} is not a multiple of {}",
            len,
            ENTRY_SIZE
        );

        let num_entries = len / ENTRY_SIZE as u64;
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            mmap,
            params: PartitionParams::derive(num_entries),
        })
    }

    pub fn params(&self) -> PartitionParams {
        self.params
    }

    pub fn num_entries(&self) -> u64 {
        self.params.num_entries
    }

    /// Record at `index`, or `None` past the end of the file.
    pub fn get(&self, index: u64) -> Option<Entry> {
        let offset = (index as usize).checked_mul(ENTRY_SIZE)?;
        let bytes = self.mmap.get(offset..offset + ENTRY_SIZE)?;
        Some(entry_from_bytes(bytes))
    }

    /// Overwrite the record at `index`; out-of-range writes are
    /// ignored.
    pub fn update(&mut self, index: u64, value: Entry) {
        let offset = index as usize * ENTRY_SIZE;
        if offset + ENTRY_SIZE <= self.mmap.len() {
            self.mmap[offset..offset + ENTRY_SIZE].copy_from_slice(&entry_to_bytes(&value));
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }

    /// One full pass over the snapshot in index order. Call again for
    /// a fresh, restarted pass.
    pub fn stream(&self) -> impl Iterator<Item = (u64, Entry)> + '_ {
        (0..self.num_entries()).map(move |index| {
            let offset = index as usize * ENTRY_SIZE;
            (
                index,
                entry_from_bytes(&self.mmap[offset..offset + ENTRY_SIZE]),
            )
        })
    }
}
