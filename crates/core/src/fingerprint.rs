//! Deterministic cache keys for emissions results.
//!
//! Weight and distance are rounded to 1 decimal place and the method is
//! lowercased before hashing, so near-duplicate requests collapse to the
//! same entry. That precision is the cache-key granularity; changing it
//! changes which requests share a paid API call.

use std::fmt;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x100_0000_01b3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheFingerprint(u64);

impl fmt::Display for CacheFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Derives the fingerprint for a (weight, distance, method) triple.
pub fn fingerprint(weight_kg: f64, distance_km: f64, method: &str) -> CacheFingerprint {
    let normalized = format!(
        "{weight_kg:.1}:{distance_km:.1}:{}",
        method.trim().to_lowercase()
    );
    CacheFingerprint(fnv1a_64(normalized.as_bytes()))
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
