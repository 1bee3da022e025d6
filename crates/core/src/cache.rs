//! Process-wide memoization of emissions results.
//!
//! The cache is the correctness mechanism that keeps paid API calls to at
//! most one per distinct (weight, distance, method) triple: every computed
//! result is stored under its fingerprint and re-read on later requests.
//! It is built once at bootstrap and injected into the comparison engine,
//! so tests can hand the engine an empty or pre-seeded cache.
//!
//! Concurrent requests racing on the same fingerprint may both miss and
//! both call the API; results are idempotent, so the second write simply
//! overwrites an equivalent value. The interior mutex only protects the
//! map storage itself.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::domain::emissions::EmissionsResult;
use crate::fingerprint::CacheFingerprint;

pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Human-readable record of how a cached value was first computed,
/// surfaced later as "As mentioned earlier: ..." on repeat answers.
#[derive(Clone, Debug, PartialEq)]
pub struct ProvenanceRecord {
    pub note: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheInner {
    results: HashMap<CacheFingerprint, EmissionsResult>,
    provenance: HashMap<CacheFingerprint, ProvenanceRecord>,
    insertion_order: VecDeque<CacheFingerprint>,
}

#[derive(Debug)]
pub struct EmissionsCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl Default for EmissionsCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl EmissionsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero capacity is coerced to 1: a cache that can never hold an
    /// entry would silently disable call deduplication.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), inner: Mutex::new(CacheInner::default()) }
    }

    pub fn get(&self, key: CacheFingerprint) -> Option<EmissionsResult> {
        self.locked().results.get(&key).cloned()
    }

    /// The provenance note recorded when the entry was first stored.
    pub fn provenance(&self, key: CacheFingerprint) -> Option<ProvenanceRecord> {
        self.locked().provenance.get(&key).cloned()
    }

    /// Stores a result and its provenance note, evicting the oldest
    /// insertion once the capacity bound is reached. Overwriting an
    /// existing fingerprint does not consume additional capacity.
    pub fn put(&self, key: CacheFingerprint, result: EmissionsResult, note: impl Into<String>) {
        let mut inner = self.locked();

        if !inner.results.contains_key(&key) {
            while inner.results.len() >= self.capacity {
                let Some(oldest) = inner.insertion_order.pop_front() else {
                    break;
                };
                inner.results.remove(&oldest);
                inner.provenance.remove(&oldest);
            }
            inner.insertion_order.push_back(key);
        }

        inner.results.insert(key, result);
        inner
            .provenance
            .insert(key, ProvenanceRecord { note: note.into(), recorded_at: Utc::now() });
    }

    pub fn len(&self) -> usize {
        self.locked().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked().results.is_empty()
    }

    fn locked(&self) -> MutexGuard<'_, CacheInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::emissions::{EmissionsResult, EmissionsSource};
    use crate::fingerprint::fingerprint;

    use super::EmissionsCache;

    fn result_fixture(method: &str, kg: f64) -> EmissionsResult {
        EmissionsResult::from_kilograms(method, kg, EmissionsSource::Api, None)
    }

    #[test]
    fn stored_results_are_read_back_with_provenance() {
        let cache = EmissionsCache::new();
        let key = fingerprint(100.0, 500.0, "air");

        cache.put(key, result_fixture("air", 250.0), "API: 100.0kg over 500.0km by air");

        let cached = cache.get(key).expect("entry should be present");
        assert_eq!(cached.emissions_kg, 250.0);
        let provenance = cache.provenance(key).expect("provenance should be recorded");
        assert_eq!(provenance.note, "API: 100.0kg over 500.0km by air");
    }

    #[test]
    fn missing_keys_are_a_miss_not_an_error() {
        let cache = EmissionsCache::new();
        assert!(cache.get(fingerprint(1.0, 1.0, "truck")).is_none());
        assert!(cache.provenance(fingerprint(1.0, 1.0, "truck")).is_none());
    }

    #[test]
    fn near_duplicate_requests_share_one_entry() {
        let cache = EmissionsCache::new();
        cache.put(fingerprint(100.04, 500.02, "Air"), result_fixture("air", 250.0), "first");

        assert!(cache.get(fingerprint(100.0, 500.0, "air")).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_bound_evicts_oldest_insertion() {
        let cache = EmissionsCache::with_capacity(2);
        let first = fingerprint(1.0, 1.0, "air");
        let second = fingerprint(2.0, 2.0, "air");
        let third = fingerprint(3.0, 3.0, "air");

        cache.put(first, result_fixture("air", 1.0), "first");
        cache.put(second, result_fixture("air", 2.0), "second");
        cache.put(third, result_fixture("air", 3.0), "third");

        assert_eq!(cache.len(), 2);
        assert!(cache.get(first).is_none(), "oldest insertion should be evicted");
        assert!(cache.provenance(first).is_none());
        assert!(cache.get(second).is_some());
        assert!(cache.get(third).is_some());
    }

    #[test]
    fn overwriting_an_entry_does_not_evict_others() {
        let cache = EmissionsCache::with_capacity(2);
        let first = fingerprint(1.0, 1.0, "air");
        let second = fingerprint(2.0, 2.0, "air");

        cache.put(first, result_fixture("air", 1.0), "first");
        cache.put(second, result_fixture("air", 2.0), "second");
        cache.put(first, result_fixture("air", 1.5), "first again");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(first).expect("entry").emissions_kg, 1.5);
        assert!(cache.get(second).is_some());
    }
}
