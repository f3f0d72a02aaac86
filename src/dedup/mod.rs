//! Bounded, LRU-by-observation deduplication of sanitized request fingerprints.
//!
//! Every `observe` call promotes the fingerprint to most-recently-used, whether it
//! was already present or not, so a fingerprint that keeps recurring never falls
//! out of the cache while one that stops recurring ages out in favor of newer
//! traffic. This is a single `lru::LruCache` behind a `Mutex`, not a separate
//! frequency counter: the promote-on-every-touch behavior of `LruCache::put` and
//! `LruCache::get` already gives us both "duplicates refresh recency" and
//! "eviction is strictly least-recently-observed" for free.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::types::Fingerprint;

/// Outcome of observing a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Not seen before (or aged out since); the caller should proceed to enqueue.
    Fresh,
    /// Seen within the cache's current window; the caller should drop the capture.
    Duplicate,
}

pub struct Deduplicator {
    cache: Mutex<LruCache<Fingerprint, ()>>,
}

impl Deduplicator {
    /// `capacity` is the maximum number of distinct fingerprints retained before the
    /// least-recently-observed one is evicted. Must be non-zero; configuration
    /// validation is responsible for rejecting zero before this is constructed.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { cache: Mutex::new(LruCache::new(capacity)) }
    }

    /// Record an observation of `fingerprint`, returning whether it was already
    /// present. Always promotes the entry to most-recently-used, so repeated
    /// observation of the same fingerprint keeps it resident indefinitely under
    /// steady traffic, while a fingerprint that stops recurring ages out on its own.
    pub fn observe(&self, fingerprint: Fingerprint) -> Observation {
        let mut cache = self.cache.lock().expect("dedup cache lock poisoned");
        if cache.get(&fingerprint).is_some() {
            Observation::Duplicate
        } else {
            cache.put(fingerprint, ());
            Observation::Fresh
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().expect("dedup cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn fp(seed: &str) -> Fingerprint {
        Fingerprint::compute("GET", "/x", &BTreeMap::new(), seed.as_bytes(), 1024)
    }

    #[test]
    fn first_observation_is_fresh() {
        let dedup = Deduplicator::new(NonZeroUsize::new(4).unwrap());
        assert_eq!(dedup.observe(fp("a")), Observation::Fresh);
    }

    #[test]
    fn repeated_observation_is_duplicate() {
        let dedup = Deduplicator::new(NonZeroUsize::new(4).unwrap());
        assert_eq!(dedup.observe(fp("a")), Observation::Fresh);
        assert_eq!(dedup.observe(fp("a")), Observation::Duplicate);
    }

    #[test]
    fn eviction_is_strictly_least_recently_observed() {
        let dedup = Deduplicator::new(NonZeroUsize::new(2).unwrap());
        dedup.observe(fp("a"));
        dedup.observe(fp("b"));
        // Touch "a" again so "b" becomes the least-recently-observed entry.
        dedup.observe(fp("a"));
        dedup.observe(fp("c"));

        assert_eq!(dedup.observe(fp("a")), Observation::Duplicate);
        assert_eq!(dedup.observe(fp("b")), Observation::Fresh);
    }

    #[test]
    fn a_fingerprint_that_stops_recurring_eventually_ages_out() {
        let dedup = Deduplicator::new(NonZeroUsize::new(1).unwrap());
        dedup.observe(fp("a"));
        dedup.observe(fp("b"));
        assert_eq!(dedup.observe(fp("a")), Observation::Fresh);
    }
}
