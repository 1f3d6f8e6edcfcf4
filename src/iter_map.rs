//! IterMap: iteration-optimized map over one dense record array.
//!
//! Buckets hold only record indices (see `index_bucket`); the records live
//! in a shared `RecordStorage`. Iteration is one linear pass over that
//! array, so its cost follows the record count high-water mark rather than
//! the bucket count. Rehash rebuilds only the bucket → index mapping and
//! never moves a record.
//!
//! Because records never move, a locator is a record index plus the slot's
//! generation. It survives rehash and unrelated erases, and goes stale only
//! when its own entry is erased or the map is cleared.

use crate::error::{KeyNotFound, StaleLocator};
use crate::index_bucket::{Claim, IndexBucket};
use crate::key::IndexKey;
use crate::policy::{
    clamp_bucket_count, grown_bucket_count, needs_growth, DEFAULT_BUCKET_COUNT, ITER_MAP_GROWTH,
};
use crate::record_storage::{RecordStorage, Slot};
use core::fmt;
use core::iter::FusedIterator;

const END: usize = usize::MAX;

/// Position of an entry inside an [`IterMap`], or its end position.
///
/// Equality is structural on the record index.
#[derive(Copy, Clone, Debug)]
pub struct Locator {
    index: usize,
    generation: u32,
    epoch: u64,
}

impl Locator {
    /// Record index, or `None` for the end locator.
    pub fn index(&self) -> Option<usize> {
        (self.index != END).then_some(self.index)
    }
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Locator {}

#[derive(Clone)]
pub struct IterMap<K, V> {
    buckets: Vec<IndexBucket>,
    records: RecordStorage<K, V>,
    initial_buckets: usize,
    // Advances on `clear`, which resets slot generations.
    epoch: u64,
}

impl<K: IndexKey, V> IterMap<K, V> {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKET_COUNT)
    }

    /// Map with `buckets` buckets (at least one); the record array starts
    /// with the same capacity. `clear` returns to this size.
    pub fn with_buckets(buckets: usize) -> Self {
        let buckets = clamp_bucket_count(buckets);
        Self {
            buckets: vec![IndexBucket::default(); buckets],
            records: RecordStorage::with_capacity(buckets),
            initial_buckets: buckets,
            epoch: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of entries in bucket `n`, or `None` if there is no such bucket.
    pub fn bucket_size(&self, n: usize) -> Option<usize> {
        self.buckets.get(n).map(IndexBucket::len)
    }

    pub fn bucket(&self, key: &K) -> usize {
        key.bucket(self.buckets.len())
    }

    /// Inserts `key → value` unless `key` is present. Returns the entry's
    /// locator and whether an insert happened; an existing value is never
    /// overwritten.
    pub fn insert(&mut self, key: K, value: V) -> (Locator, bool) {
        self.insert_with(key, || value)
    }

    pub fn insert_with<F>(&mut self, key: K, make: F) -> (Locator, bool)
    where
        F: FnOnce() -> V,
    {
        let (index, inserted) = self.insert_index(key, make);
        (self.locator(index), inserted)
    }

    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let (index, _) = self.insert_index(key, V::default);
        let entry = self.records.entry_mut(index);
        debug_assert!(entry.is_some(), "record {index} is live after insert");
        &mut entry.get_or_insert_with(|| (key, V::default())).1
    }

    pub fn find(&self, key: &K) -> Option<Locator> {
        self.find_index(key).map(|index| self.locator(index))
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.find_index(key)?;
        self.records.get(index).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.find_index(key)?;
        self.records.get_mut(index).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find_index(key).is_some()
    }

    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains_key(key))
    }

    pub fn at(&self, key: &K) -> Result<&V, KeyNotFound> {
        self.get(key).ok_or(KeyNotFound)
    }

    pub fn at_mut(&mut self, key: &K) -> Result<&mut V, KeyNotFound> {
        self.get_mut(key).ok_or(KeyNotFound)
    }

    pub fn erase(&mut self, key: &K) -> usize {
        usize::from(self.remove(key).is_some())
    }

    /// Unlinks `key` from its bucket and holes its record.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let b = key.bucket(self.buckets.len());
        let index = self.buckets[b].erase_key(&self.records, *key)?;
        let (_, value) = self.records.erase(index)?;
        Some(value)
    }

    /// Removes the entry at `loc`; returns the locator of the next live record.
    pub fn erase_at(&mut self, loc: Locator) -> Result<Locator, StaleLocator> {
        let index = self.live_index(loc)?;
        let next = self.records.next_occupied_from(index as usize + 1);
        let key = self.records.key(index).ok_or(StaleLocator)?;
        let b = key.bucket(self.buckets.len());
        let unlinked = self.buckets[b].erase_index(index);
        debug_assert_eq!(unlinked, Some(index));
        self.records.erase(index);
        Ok(self.cursor_locator(next))
    }

    /// Removes every entry from `first` up to, not including, `last`.
    /// Returns `last`, which records never moving keeps valid.
    ///
    /// Both ends are validated before anything is erased: a stale `first`
    /// or `last` fails with the map untouched.
    pub fn erase_range(&mut self, first: Locator, last: Locator) -> Result<Locator, StaleLocator> {
        self.check_bound(first)?;
        self.check_bound(last)?;
        let mut cur = first;
        while cur != last && cur.index != END {
            cur = self.erase_at(cur)?;
        }
        Ok(last)
    }

    /// Drops every entry, restoring the bucket count and record capacity
    /// the map was built with.
    pub fn clear(&mut self) {
        self.buckets = vec![IndexBucket::default(); self.initial_buckets];
        self.records.clear(self.initial_buckets);
        self.epoch += 1;
    }

    pub fn begin(&self) -> Locator {
        self.cursor_locator(self.records.first_nonempty_slot())
    }

    pub fn end(&self) -> Locator {
        Locator {
            index: END,
            generation: 0,
            epoch: self.epoch,
        }
    }

    pub fn is_end(&self, loc: Locator) -> bool {
        loc.index == END
    }

    /// Next live record after `loc`. Advancing `end()` yields `end()`.
    pub fn advance(&self, loc: Locator) -> Result<Locator, StaleLocator> {
        self.check_cursor(loc)?;
        if loc.index == END {
            return Ok(self.end());
        }
        let index = self.live_index(loc)?;
        Ok(self.successor(index))
    }

    /// `(find(key), locator after it)`, or `(end(), end())` when absent.
    pub fn equal_range(&self, key: &K) -> (Locator, Locator) {
        match self.find_index(key) {
            Some(index) => (self.locator(index), self.successor(index)),
            None => (self.end(), self.end()),
        }
    }

    pub fn entry_at(&self, loc: Locator) -> Result<(&K, &V), StaleLocator> {
        let index = self.live_index(loc)?;
        self.records.get(index).ok_or(StaleLocator)
    }

    pub fn value_at_mut(&mut self, loc: Locator) -> Result<&mut V, StaleLocator> {
        let index = self.live_index(loc)?;
        self.records.get_mut(index).map(|(_, v)| v).ok_or(StaleLocator)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.records.occupied_range().iter(),
            remaining: self.records.len(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let remaining = self.records.len();
        IterMut {
            slots: self.records.occupied_range_mut().iter_mut(),
            remaining,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Record index of `key`, inserting it first if absent.
    fn insert_index<F>(&mut self, key: K, make: F) -> (u32, bool)
    where
        F: FnOnce() -> V,
    {
        if needs_growth(self.len(), self.buckets.len()) {
            self.rehash(grown_bucket_count(self.buckets.len(), ITER_MAP_GROWTH));
        }
        let b = key.bucket(self.buckets.len());
        match self.buckets[b].claim(&self.records, key) {
            Claim::Occupied(index) => (index, false),
            Claim::Vacant(slot) => {
                let index = self.records.insert(key, make());
                *slot = index;
                (index, true)
            }
        }
    }

    fn find_index(&self, key: &K) -> Option<u32> {
        let b = key.bucket(self.buckets.len());
        self.buckets[b].find(&self.records, *key)
    }

    /// Locator of the first live record after `index`.
    fn successor(&self, index: u32) -> Locator {
        self.cursor_locator(self.records.next_occupied_from(index as usize + 1))
    }

    fn locator(&self, index: u32) -> Locator {
        Locator {
            index: index as usize,
            generation: self.records.generation(index).unwrap_or(0),
            epoch: self.epoch,
        }
    }

    /// Locator for a storage position that is either live or the cursor.
    fn cursor_locator(&self, position: usize) -> Locator {
        if position >= self.records.next_empty_slot_cursor() {
            return self.end();
        }
        self.locator(position as u32)
    }

    fn check_cursor(&self, loc: Locator) -> Result<(), StaleLocator> {
        if loc.epoch != self.epoch {
            return Err(StaleLocator);
        }
        Ok(())
    }

    /// A range bound is either `end()` of this epoch or a live entry.
    fn check_bound(&self, loc: Locator) -> Result<(), StaleLocator> {
        self.check_cursor(loc)?;
        if loc.index != END {
            self.live_index(loc)?;
        }
        Ok(())
    }

    fn live_index(&self, loc: Locator) -> Result<u32, StaleLocator> {
        self.check_cursor(loc)?;
        let index = u32::try_from(loc.index).map_err(|_| StaleLocator)?;
        match self.records.generation(index) {
            Some(generation) if generation == loc.generation => Ok(index),
            _ => Err(StaleLocator),
        }
    }

    /// Rebuilds the bucket array at `new_buckets` buckets. Records stay put.
    fn rehash(&mut self, new_buckets: usize) {
        self.buckets = vec![IndexBucket::default(); new_buckets];
        for (index, key) in self.records.live_keys() {
            self.buckets[key.bucket(new_buckets)].record_value_index(index);
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.records.check_invariants();
        let mut owners = vec![None; self.records.next_empty_slot_cursor()];
        for (b, bucket) in self.buckets.iter().enumerate() {
            bucket.check_invariants();
            for index in bucket.indices() {
                let key = self
                    .records
                    .key(index)
                    .unwrap_or_else(|| panic!("bucket {b} references hole {index}"));
                assert_eq!(key.bucket(self.buckets.len()), b, "key {key:?} in wrong bucket");
                assert!(owners[index as usize].replace(b).is_none(), "index {index} in two buckets");
            }
        }
        for (index, _) in self.records.live_keys() {
            assert!(owners[index as usize].is_some(), "record {index} unreachable");
        }
    }
}

impl<K: IndexKey, V> Default for IterMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: IndexKey, V: fmt::Debug> fmt::Debug for IterMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: IndexKey, V: PartialEq> PartialEq for IterMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: IndexKey, V: Eq> Eq for IterMap<K, V> {}

/// Inserts each pair in order; keys already present keep their value.
impl<K: IndexKey, V> Extend<(K, V)> for IterMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: IndexKey, V> FromIterator<(K, V)> for IterMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: IndexKey, V, const N: usize> From<[(K, V); N]> for IterMap<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Iterator over entries in record-array order.
pub struct Iter<'a, K, V> {
    slots: core::slice::Iter<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Some((k, v)) = &slot.entry {
                self.remaining -= 1;
                return Some((k, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over entries in record-array order with mutable values.
pub struct IterMut<'a, K, V> {
    slots: core::slice::IterMut<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot {
                entry: Some((k, v)),
                ..
            } = slot
            {
                self.remaining -= 1;
                return Some((&*k, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over entries in record-array order.
pub struct IntoIter<K, V> {
    slots: std::vec::IntoIter<Slot<K, V>>,
    remaining: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Some(entry) = slot.entry {
                self.remaining -= 1;
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<'a, K: IndexKey, V> IntoIterator for &'a IterMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K: IndexKey, V> IntoIterator for &'a mut IterMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K: IndexKey, V> IntoIterator for IterMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.records.len(),
            slots: self.records.into_slots().into_iter(),
        }
    }
}
