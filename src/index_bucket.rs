//! IndexBucket: one bucket of an `IterMap`, holding record indices only.
//!
//! The first [`INLINE_INDICES`] indices live inline; further ones spill into
//! an overflow list that exists only while it is non-empty. Keys are
//! compared by looking the index up in the shared record storage.
//!
//! Invariants: an index appears at most once per bucket, and the overflow
//! list is `Some` only while the inline array is full.

use crate::key::IndexKey;
use crate::policy::INLINE_INDICES;
use crate::record_storage::RecordStorage;

// Written into a claimed slot until the caller stores the real index.
const PENDING: u32 = u32::MAX;

// `inline_len` is a `u8`.
const _: () = assert!(INLINE_INDICES <= u8::MAX as usize);

#[derive(Clone, Debug, Default)]
pub(crate) struct IndexBucket {
    inline: [u32; INLINE_INDICES],
    inline_len: u8,
    overflow: Option<Vec<u32>>,
}

/// Outcome of [`IndexBucket::claim`].
pub(crate) enum Claim<'a> {
    /// The key is already stored at this record index.
    Occupied(u32),
    /// The key is absent; the caller must write the new record's index here.
    Vacant(&'a mut u32),
}

impl IndexBucket {
    pub(crate) fn len(&self) -> usize {
        self.inline_len as usize + self.overflow.as_ref().map_or(0, Vec::len)
    }

    /// Every index in this bucket, inline ones first.
    pub(crate) fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.inline[..self.inline_len as usize]
            .iter()
            .chain(self.overflow.iter().flatten())
            .copied()
    }

    /// Finds `key`, or reserves a slot for it.
    pub(crate) fn claim<'a, K: IndexKey, V>(
        &'a mut self,
        records: &RecordStorage<K, V>,
        key: K,
    ) -> Claim<'a> {
        let n = self.inline_len as usize;
        if let Some(&index) = self.inline[..n].iter().find(|&&i| records.key(i) == Some(key)) {
            return Claim::Occupied(index);
        }
        if n < INLINE_INDICES {
            self.inline_len += 1;
            self.inline[n] = PENDING;
            return Claim::Vacant(&mut self.inline[n]);
        }
        let overflow = self.overflow.get_or_insert_with(Vec::new);
        if let Some(&index) = overflow.iter().find(|&&i| records.key(i) == Some(key)) {
            return Claim::Occupied(index);
        }
        overflow.push(PENDING);
        let last = overflow.len() - 1;
        Claim::Vacant(&mut overflow[last])
    }

    /// Registers an index without comparing keys. Rehash only: the caller
    /// guarantees the record's key is not yet in this bucket.
    pub(crate) fn record_value_index(&mut self, index: u32) {
        let n = self.inline_len as usize;
        if n < INLINE_INDICES {
            self.inline[n] = index;
            self.inline_len += 1;
        } else {
            self.overflow.get_or_insert_with(Vec::new).push(index);
        }
    }

    pub(crate) fn find<K: IndexKey, V>(&self, records: &RecordStorage<K, V>, key: K) -> Option<u32> {
        self.indices().find(|&i| records.key(i) == Some(key))
    }

    /// Drops the reference to `key`'s record and returns its index.
    pub(crate) fn erase_key<K: IndexKey, V>(
        &mut self,
        records: &RecordStorage<K, V>,
        key: K,
    ) -> Option<u32> {
        self.erase_where(|i| records.key(i) == Some(key))
    }

    /// Drops the reference to record `index`.
    pub(crate) fn erase_index(&mut self, index: u32) -> Option<u32> {
        self.erase_where(|i| i == index)
    }

    fn erase_where<F>(&mut self, matches: F) -> Option<u32>
    where
        F: Fn(u32) -> bool,
    {
        let n = self.inline_len as usize;
        if let Some(pos) = self.inline[..n].iter().position(|&i| matches(i)) {
            let index = self.inline[pos];
            self.shrink_inline(pos);
            return Some(index);
        }
        let overflow = self.overflow.as_mut()?;
        let pos = overflow.iter().position(|&i| matches(i))?;
        let index = overflow.swap_remove(pos);
        if overflow.is_empty() {
            self.overflow = None;
        }
        Some(index)
    }

    /// Fills inline position `pos` from the overflow list when there is one,
    /// otherwise closes the gap by shifting later inline entries left.
    fn shrink_inline(&mut self, pos: usize) {
        if let Some(overflow) = self.overflow.as_mut() {
            if let Some(index) = overflow.pop() {
                self.inline[pos] = index;
                if overflow.is_empty() {
                    self.overflow = None;
                }
                return;
            }
        }
        let n = self.inline_len as usize;
        self.inline.copy_within(pos + 1..n, pos);
        self.inline_len -= 1;
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        if let Some(overflow) = &self.overflow {
            assert!(!overflow.is_empty(), "empty overflow list must be None");
            assert_eq!(self.inline_len as usize, INLINE_INDICES, "overflow before inline is full");
        }
        let all: Vec<u32> = self.indices().collect();
        for (i, idx) in all.iter().enumerate() {
            assert_ne!(*idx, PENDING, "unfilled claim");
            assert!(!all[i + 1..].contains(idx), "index {idx} twice in one bucket");
        }
    }
}
