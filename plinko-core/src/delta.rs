//! Delta stream codec.
//!
//! Updates travel as `(index, delta)` tuples with `delta = old ^ new`.
//! The binary form is a 16-byte header (record count, limbs per
//! record, both little-endian u64) followed by fixed-width records:
//! 8-byte index then the 32-byte entry delta.

use crate::entry::{entry_from_bytes, entry_to_bytes, Entry, ENTRY_SIZE, ENTRY_WORDS};
use eyre::{ensure, Result};
use std::io::{Read, Write};

/// Bytes per delta record: index plus entry.
pub const DELTA_RECORD_SIZE: usize = 8 + ENTRY_SIZE;

/// Write a delta batch in wire order.
pub fn write_deltas<W: Write>(writer: &mut W, deltas: &[(u64, Entry)]) -> Result<()> {
    writer.write_all(&(deltas.len() as u64).to_le_bytes())?;
    writer.write_all(&(ENTRY_WORDS as u64).to_le_bytes())?;
    for (index, delta) in deltas {
        writer.write_all(&index.to_le_bytes())?;
        writer.write_all(&entry_to_bytes(delta))?;
    }
    Ok(())
}

/// Lazily yields `(index, delta)` tuples from a delta stream, in the
/// producer's order.
pub struct DeltaReader<R: Read> {
    inner: R,
    remaining: u64,
}

impl<R: Read> DeltaReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let mut header = [0u8; 16];
        inner.read_exact(&mut header)?;
        let count = u64::from_le_bytes(header[0..8].try_into().unwrap());
        let words = u64::from_le_bytes(header[8..16].try_into().unwrap());
        ensure!(
            words == ENTRY_WORDS as u64,
            "unsupported delta record width: {} limbs",
            words
        );
        Ok(Self {
            inner,
            remaining: count,
        })
    }

    /// Records left to read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<R: Read> Iterator for DeltaReader<R> {
    type Item = Result<(u64, Entry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mut record = [0u8; DELTA_RECORD_SIZE];
        match self.inner.read_exact(&mut record) {
            Ok(()) => {
                let index = u64::from_le_bytes(record[0..8].try_into().unwrap());
                Some(Ok((index, entry_from_bytes(&record[8..]))))
            }
            Err(err) => {
                // Stop after reporting a short read once.
                self.remaining = 0;
                Some(Err(err.into()))
            }
        }
    }
}
