//! Key hashing for the slot index

use hash32::{Hasher, Murmur3Hasher};

/// Signature of a pluggable key hash: `(key, seed) -> hash`.
pub type HashFn = fn(&[u8], u32) -> u32;

/// Default seed used by the server.
pub const DEFAULT_SEED: u32 = 1;

/// MurmurHash3 (x86, 32-bit) over the seed followed by the key bytes.
pub fn murmur3(key: &[u8], seed: u32) -> u32 {
    let mut hasher = Murmur3Hasher::default();
    hasher.write(&seed.to_le_bytes());
    hasher.write(key);
    hasher.finish()
}
