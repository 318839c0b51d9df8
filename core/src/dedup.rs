//! Duplicate suppression: bounded FIFO of payload fingerprints
//!
//! Fingerprints cover the payload bytes only, so two unrelated packets with
//! identical payloads are treated as the same packet. Periodic routing
//! advertisements that repeat an unchanged entry are suppressed the same way
//! until the entry ages out of the window.

use std::collections::{HashSet, VecDeque};

/// Window size used by nodes unless configured otherwise
pub const DEFAULT_DEDUP_CAPACITY: usize = 100;

/// First 8 bytes of blake3(payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 8]);

impl Fingerprint {
    pub fn of(payload: &[u8]) -> Self {
        let hash = blake3::hash(payload);
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        Fingerprint(bytes)
    }
}

/// Bounded set of recently seen fingerprints; oldest evicted first
#[derive(Debug, Clone)]
pub struct DedupCache {
    capacity: usize,
    order: VecDeque<Fingerprint>,
    seen: HashSet<Fingerprint>,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DEDUP_CAPACITY)
    }

    /// A capacity of 0 is treated as 1
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    pub fn fingerprint(payload: &[u8]) -> Fingerprint {
        Fingerprint::of(payload)
    }

    /// Returns true if `key` was already present (caller drops the packet).
    /// Otherwise records it, evicting the oldest record when full.
    pub fn contains_and_record(&mut self, key: Fingerprint) -> bool {
        if self.seen.contains(&key) {
            return true;
        }

        self.seen.insert(key);
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        false
    }

    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
