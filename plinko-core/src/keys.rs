//! Key derivation from the deployment master secret.
//!
//! Every key in the system is derived from a single 128-bit master
//! secret via domain-separated SHA-256. Derivation is deterministic:
//! a restarted client regenerates the same subkeys, so hint caches
//! built under them stay valid.

use crate::error::PirError;
use sha2::{Digest, Sha256};

/// 128-bit AES key.
pub type PrfKey128 = [u8; 16];

/// Required master secret length in bytes.
pub const MASTER_SECRET_LEN: usize = 16;

/// Version label mixed into every derivation.
const DERIVATION_LABEL: &[u8] = b"iprf-key-derivation-v1";

/// Reserved context for the permutation subkey.
pub const CONTEXT_PRP: &str = "iprf-P-v1";
/// Reserved context for the multinomial-sampler subkey.
pub const CONTEXT_PMNS: &str = "iprf-S-v1";

/// The deployment master secret.
///
/// Held for the lifetime of the client instance; the backing bytes
/// are wiped when the value is dropped.
pub struct MasterSecret([u8; MASTER_SECRET_LEN]);

impl MasterSecret {
    pub fn new(bytes: &[u8]) -> Result<Self, PirError> {
        if bytes.len() != MASTER_SECRET_LEN {
            return Err(PirError::KeyDerivation { got: bytes.len() });
        }
        let mut secret = [0u8; MASTER_SECRET_LEN];
        secret.copy_from_slice(bytes);
        Ok(Self(secret))
    }

    /// Derive a 128-bit subkey for `context`:
    /// `SHA-256(master ‖ "iprf-key-derivation-v1" ‖ context)` truncated
    /// to 16 bytes.
    pub fn derive(&self, context: &str) -> PrfKey128 {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(DERIVATION_LABEL);
        hasher.update(context.as_bytes());
        let hash = hasher.finalize();
        let mut key = [0u8; 16];
        key.copy_from_slice(&hash[0..16]);
        key
    }
}

impl Drop for MasterSecret {
    fn drop(&mut self) {
        for byte in self.0.iter_mut() {
            // Volatile so the wipe survives optimization.
            unsafe { std::ptr::write_volatile(byte, 0) };
        }
    }
}
