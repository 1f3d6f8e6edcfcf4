//! FindBucket: a self-contained record store for one bucket of a `FindMap`.
//!
//! Records live in a growable array owned by the bucket. The first
//! [`INLINE_KEYS`] keys are mirrored in an inline array so that most lookups
//! compare keys without touching the value payloads.
//!
//! Invariant: for every `i < min(len, INLINE_KEYS)`,
//! `inline[i] == records[i].0`. Once a bucket holds more than
//! `INLINE_KEYS` records, lookups also scan the uncached tail.

use crate::key::IndexKey;
use crate::policy::{INITIAL_RECORD_CAPACITY, INLINE_KEYS};

#[derive(Clone, Debug)]
pub(crate) struct FindBucket<K, V> {
    inline: [K; INLINE_KEYS],
    records: Vec<(K, V)>,
}

impl<K: IndexKey, V> FindBucket<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            inline: [K::default(); INLINE_KEYS],
            records: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub(crate) fn records(&self) -> &[(K, V)] {
        &self.records
    }

    #[inline]
    pub(crate) fn records_mut(&mut self) -> &mut [(K, V)] {
        &mut self.records
    }

    /// Slot of `key` in this bucket, if present.
    pub(crate) fn find(&self, key: K) -> Option<usize> {
        let n = self.records.len();
        let cached = n.min(INLINE_KEYS);
        if let Some(slot) = self.inline[..cached].iter().position(|&k| k == key) {
            return Some(slot);
        }
        if n <= INLINE_KEYS {
            return None;
        }
        self.records[INLINE_KEYS..]
            .iter()
            .position(|(k, _)| *k == key)
            .map(|i| i + INLINE_KEYS)
    }

    /// Returns `(slot, inserted)`. An existing key keeps its value and
    /// `make` is not called.
    pub(crate) fn insert_with<F>(&mut self, key: K, make: F) -> (usize, bool)
    where
        F: FnOnce() -> V,
    {
        match self.find(key) {
            Some(slot) => (slot, false),
            None => (self.push(key, make()), true),
        }
    }

    /// Appends a record whose key is known to be absent from this bucket.
    pub(crate) fn push(&mut self, key: K, value: V) -> usize {
        debug_assert!(self.find(key).is_none(), "duplicate key {key:?} pushed");
        if self.records.len() == self.records.capacity() {
            // Capacity doubles, starting at INITIAL_RECORD_CAPACITY.
            let additional = self.records.capacity().max(INITIAL_RECORD_CAPACITY);
            self.records.reserve_exact(additional);
        }
        let slot = self.records.len();
        self.records.push((key, value));
        if slot < INLINE_KEYS {
            self.inline[slot] = key;
        }
        slot
    }

    pub(crate) fn erase(&mut self, key: K) -> Option<(K, V)> {
        let slot = self.find(key)?;
        self.erase_slot(slot)
    }

    /// Swap-remove: the last record moves into `slot`. Any slot index that
    /// referred to the last record now refers to `slot`.
    pub(crate) fn erase_slot(&mut self, slot: usize) -> Option<(K, V)> {
        let last = self.records.len().checked_sub(1)?;
        if slot > last {
            return None;
        }
        if slot < INLINE_KEYS {
            self.inline[slot] = self.records[last].0;
        }
        Some(self.records.swap_remove(slot))
    }

    /// Moves all records out, leaving the bucket empty. The record array's
    /// allocation goes with them.
    pub(crate) fn take_records(&mut self) -> Vec<(K, V)> {
        core::mem::take(&mut self.records)
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.records.capacity()
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let cached = self.records.len().min(INLINE_KEYS);
        for i in 0..cached {
            assert_eq!(self.inline[i], self.records[i].0, "inline cache diverged at {i}");
        }
        for (i, (k, _)) in self.records.iter().enumerate() {
            assert_eq!(
                self.records.iter().position(|(o, _)| o == k),
                Some(i),
                "duplicate key {k:?} in bucket"
            );
        }
    }
}
