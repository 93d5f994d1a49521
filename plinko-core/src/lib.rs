//! Plinko PIR cryptographic core
//!
//! Single-server PIR with client-side hints and constant-work
//! updates. The pieces, leaves first:
//!
//! - `prf`: AES-128 block PRF, the sole randomness source
//! - `prp`: small-domain permutations (Feistel + cycle walking, or
//!   lookup tables)
//! - `binomial` / `pmns`: derandomized ball-to-bin sampling
//! - `iprf`: invertible PRF `F = S ∘ P` with preimage enumeration
//! - `hints`: client hint engine (offline build, query, update)
//! - `server`: set-parity and structured query answering
//! - `db` / `delta` / `entry` / `keys`: snapshot format, delta
//!   streams, entry codec, key derivation

pub mod binomial;
pub mod db;
pub mod delta;
pub mod entry;
pub mod error;
pub mod hints;
pub mod iprf;
pub mod keys;
pub mod pmns;
pub mod prf;
pub mod prp;
pub mod server;
