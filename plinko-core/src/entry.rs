//! Database entry representation.
//!
//! Entries are 256-bit opaque words held as four little-endian u64
//! limbs; the on-disk and on-wire form is the 32-byte little-endian
//! concatenation of the limbs.

use eyre::{ensure, Result};

/// Bytes per database record.
pub const ENTRY_SIZE: usize = 32;
/// u64 limbs per database record.
pub const ENTRY_WORDS: usize = 4;

/// A 256-bit database value.
pub type Entry = [u64; ENTRY_WORDS];

/// The all-zero entry; also the value read from the padding tail.
pub const ZERO_ENTRY: Entry = [0u64; ENTRY_WORDS];

/// XOR `src` into `dst` in place.
#[inline]
pub fn xor_entry(dst: &mut Entry, src: &Entry) {
    for i in 0..ENTRY_WORDS {
        dst[i] ^= src[i];
    }
}

/// Decode a 32-byte little-endian record.
///
/// # Panics
///
/// Panics if `bytes` is shorter than [`ENTRY_SIZE`].
pub fn entry_from_bytes(bytes: &[u8]) -> Entry {
    let mut entry = ZERO_ENTRY;
    for (i, limb) in entry.iter_mut().enumerate() {
        *limb = u64::from_le_bytes(bytes[i * 8..(i + 1) * 8].try_into().unwrap());
    }
    entry
}

/// Encode an entry as its 32-byte little-endian record.
pub fn entry_to_bytes(entry: &Entry) -> [u8; ENTRY_SIZE] {
    let mut bytes = [0u8; ENTRY_SIZE];
    for (i, limb) in entry.iter().enumerate() {
        bytes[i * 8..(i + 1) * 8].copy_from_slice(&limb.to_le_bytes());
    }
    bytes
}

/// Lossless wire encoding: lowercase hex of the 32-byte record.
pub fn encode_entry_hex(entry: &Entry) -> String {
    hex::encode(entry_to_bytes(entry))
}

/// Parse the wire encoding produced by [`encode_entry_hex`].
pub fn decode_entry_hex(text: &str) -> Result<Entry> {
    let bytes = hex::decode(text)?;
    ensure!(
        bytes.len() == ENTRY_SIZE,
        "entry encoding must be {} bytes, got {}",
        ENTRY_SIZE,
        bytes.len()
    );
    Ok(entry_from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn xor_is_involutive() {
        let a: Entry = [1, 2, 3, 4];
        let b: Entry = [0xFF, 0xAA, 0x55, 0x00];
        let mut acc = a;
        xor_entry(&mut acc, &b);
        xor_entry(&mut acc, &b);
        assert_eq!(acc, a);
    }

    #[test]
    fn byte_codec_is_little_endian() {
        let entry: Entry = [0x0102030405060708, 0, 0, 0];
        let bytes = entry_to_bytes(&entry);
        assert_eq!(&bytes[0..8], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(entry_from_bytes(&bytes), entry);
    }

    #[test]
    fn hex_rejects_wrong_length() {
        assert!(decode_entry_hex("abcd").is_err());
        assert!(decode_entry_hex("zz").is_err());
    }

    proptest! {
        #[test]
        fn byte_codec_roundtrip(limbs: [u64; ENTRY_WORDS]) {
            let entry: Entry = limbs;
            prop_assert_eq!(entry_from_bytes(&entry_to_bytes(&entry)), entry);
        }

        #[test]
        fn hex_codec_roundtrip(limbs: [u64; ENTRY_WORDS]) {
            let entry: Entry = limbs;
            let text = encode_entry_hex(&entry);
            prop_assert_eq!(decode_entry_hex(&text).unwrap(), entry);
        }
    }
}
