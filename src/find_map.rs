//! FindMap: lookup-optimized map built from self-contained buckets.
//!
//! Each bucket owns its records (see `find_bucket`), so a lookup touches
//! one bucket header and, usually, only the inline key cache inside it.
//!
//! Locators are `(bucket, slot)` pairs stamped with the map's epoch. The
//! epoch advances on every operation that can relocate records: rehash,
//! successful erase (swap-remove) and `clear`. A locator from an older
//! epoch is rejected with [`StaleLocator`] instead of silently naming a
//! different entry.

use crate::error::{KeyNotFound, StaleLocator};
use crate::find_bucket::FindBucket;
use crate::key::IndexKey;
use crate::policy::{
    clamp_bucket_count, grown_bucket_count, needs_growth, DEFAULT_BUCKET_COUNT, FIND_MAP_GROWTH,
};
use core::cmp::Ordering;
use core::fmt;
use core::iter::FusedIterator;

/// Position of an entry inside a [`FindMap`], or its end position.
///
/// Equality and ordering are structural on `(bucket, slot)`.
#[derive(Copy, Clone, Debug)]
pub struct Locator {
    bucket: usize,
    slot: usize,
    epoch: u64,
}

impl Locator {
    pub fn bucket(&self) -> usize {
        self.bucket
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.bucket == other.bucket && self.slot == other.slot
    }
}

impl Eq for Locator {}

impl PartialOrd for Locator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Locator {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.bucket, self.slot).cmp(&(other.bucket, other.slot))
    }
}

#[derive(Clone)]
pub struct FindMap<K, V> {
    buckets: Vec<FindBucket<K, V>>,
    len: usize,
    initial_buckets: usize,
    epoch: u64,
}

impl<K: IndexKey, V> FindMap<K, V> {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKET_COUNT)
    }

    /// Map with `buckets` buckets (at least one). `clear` returns to this count.
    pub fn with_buckets(buckets: usize) -> Self {
        let buckets = clamp_bucket_count(buckets);
        Self {
            buckets: allocate(buckets),
            len: 0,
            initial_buckets: buckets,
            epoch: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of entries in bucket `n`, or `None` if there is no such bucket.
    pub fn bucket_size(&self, n: usize) -> Option<usize> {
        self.buckets.get(n).map(FindBucket::len)
    }

    /// Bucket that `key` hashes to under the current bucket count.
    pub fn bucket(&self, key: &K) -> usize {
        key.bucket(self.buckets.len())
    }

    /// Inserts `key → value` unless `key` is present. Returns the entry's
    /// locator and whether an insert happened; an existing value is never
    /// overwritten.
    pub fn insert(&mut self, key: K, value: V) -> (Locator, bool) {
        self.insert_with(key, || value)
    }

    /// Like [`insert`](Self::insert), building the value only on insert.
    pub fn insert_with<F>(&mut self, key: K, make: F) -> (Locator, bool)
    where
        F: FnOnce() -> V,
    {
        // Grow first so the new entry lands in the post-growth table.
        if needs_growth(self.len, self.buckets.len()) {
            self.rehash(grown_bucket_count(self.buckets.len(), FIND_MAP_GROWTH));
        }
        let b = key.bucket(self.buckets.len());
        let (slot, inserted) = self.buckets[b].insert_with(key, make);
        if inserted {
            self.len += 1;
        }
        (self.locator(b, slot), inserted)
    }

    /// Value for `key`, inserting `V::default()` first if absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let (loc, _) = self.insert_with(key, V::default);
        &mut self.buckets[loc.bucket].records_mut()[loc.slot].1
    }

    pub fn find(&self, key: &K) -> Option<Locator> {
        let b = key.bucket(self.buckets.len());
        self.buckets[b].find(*key).map(|slot| self.locator(b, slot))
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let b = key.bucket(self.buckets.len());
        let bucket = &self.buckets[b];
        bucket.find(*key).map(|slot| &bucket.records()[slot].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let b = key.bucket(self.buckets.len());
        let bucket = &mut self.buckets[b];
        let slot = bucket.find(*key)?;
        Some(&mut bucket.records_mut()[slot].1)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// 1 if `key` is present, else 0.
    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains_key(key))
    }

    pub fn at(&self, key: &K) -> Result<&V, KeyNotFound> {
        self.get(key).ok_or(KeyNotFound)
    }

    pub fn at_mut(&mut self, key: &K) -> Result<&mut V, KeyNotFound> {
        self.get_mut(key).ok_or(KeyNotFound)
    }

    /// Removes `key`, returning how many entries were removed (0 or 1).
    pub fn erase(&mut self, key: &K) -> usize {
        usize::from(self.remove(key).is_some())
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let b = key.bucket(self.buckets.len());
        let (_, value) = self.buckets[b].erase(*key)?;
        self.len -= 1;
        self.epoch += 1;
        Some(value)
    }

    /// Removes the entry at `loc` and returns the locator of the entry that
    /// iteration would visit next, so erasing inside a `begin`/`advance` loop
    /// visits every remaining entry exactly once.
    pub fn erase_at(&mut self, loc: Locator) -> Result<Locator, StaleLocator> {
        let (b, slot) = self.live_position(loc)?;
        // Decide the successor before the swap-remove reshuffles the bucket:
        // the bucket's last record is about to move into `slot`.
        let (next_bucket, next_slot) = if slot + 1 < self.buckets[b].len() {
            (b, slot)
        } else {
            (self.first_occupied_from(b + 1), 0)
        };
        let removed = self.buckets[b].erase_slot(slot);
        debug_assert!(removed.is_some());
        self.len -= 1;
        self.epoch += 1;
        Ok(self.locator(next_bucket, next_slot))
    }

    /// Removes every entry iteration visits from `first` up to, not
    /// including, `last`. Returns the locator of `last`'s entry afterwards.
    pub fn erase_range(&mut self, first: Locator, last: Locator) -> Result<Locator, StaleLocator> {
        self.check_bound(first)?;
        self.check_bound(last)?;
        let last_key = self.entry_at(last).ok().map(|(k, _)| *k);
        let mut doomed = Vec::new();
        let mut cur = first;
        while cur != last && !self.is_end(cur) {
            doomed.push(*self.entry_at(cur)?.0);
            cur = self.advance(cur)?;
        }
        for key in &doomed {
            self.remove(key);
        }
        Ok(last_key.and_then(|k| self.find(&k)).unwrap_or_else(|| self.end()))
    }

    /// Drops every entry and restores the bucket count the map was built with.
    pub fn clear(&mut self) {
        self.buckets = allocate(self.initial_buckets);
        self.len = 0;
        self.epoch += 1;
    }

    /// Locator of the first entry in bucket order, or `end()` when empty.
    pub fn begin(&self) -> Locator {
        if self.len == 0 {
            return self.end();
        }
        self.locator(self.first_occupied_from(0), 0)
    }

    pub fn end(&self) -> Locator {
        self.locator(self.buckets.len(), 0)
    }

    pub fn is_end(&self, loc: Locator) -> bool {
        loc.bucket >= self.buckets.len()
    }

    /// Locator following `loc` in bucket order. Advancing `end()` yields `end()`.
    pub fn advance(&self, loc: Locator) -> Result<Locator, StaleLocator> {
        self.check_cursor(loc)?;
        if self.is_end(loc) {
            return Ok(self.end());
        }
        let (b, slot) = self.live_position(loc)?;
        Ok(self.successor(b, slot))
    }

    /// `(find(key), locator after it)`, or `(end(), end())` when absent.
    pub fn equal_range(&self, key: &K) -> (Locator, Locator) {
        let b = key.bucket(self.buckets.len());
        match self.buckets[b].find(*key) {
            Some(slot) => (self.locator(b, slot), self.successor(b, slot)),
            None => (self.end(), self.end()),
        }
    }

    /// Key and value at `loc`. `end()` names no entry and is rejected too.
    pub fn entry_at(&self, loc: Locator) -> Result<(&K, &V), StaleLocator> {
        let (b, slot) = self.live_position(loc)?;
        let (k, v) = &self.buckets[b].records()[slot];
        Ok((k, v))
    }

    pub fn value_at_mut(&mut self, loc: Locator) -> Result<&mut V, StaleLocator> {
        let (b, slot) = self.live_position(loc)?;
        Ok(&mut self.buckets[b].records_mut()[slot].1)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            records: Default::default(),
            remaining: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            buckets: self.buckets.iter_mut(),
            records: Default::default(),
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    fn locator(&self, bucket: usize, slot: usize) -> Locator {
        Locator {
            bucket,
            slot,
            epoch: self.epoch,
        }
    }

    fn check_cursor(&self, loc: Locator) -> Result<(), StaleLocator> {
        if loc.epoch != self.epoch || loc.bucket > self.buckets.len() {
            return Err(StaleLocator);
        }
        Ok(())
    }

    /// A range bound is either `end()` of this epoch or a live entry.
    fn check_bound(&self, loc: Locator) -> Result<(), StaleLocator> {
        self.check_cursor(loc)?;
        if !self.is_end(loc) {
            self.live_position(loc)?;
        }
        Ok(())
    }

    /// Locator following the live entry at `(b, slot)` in bucket order.
    fn successor(&self, b: usize, slot: usize) -> Locator {
        if slot + 1 < self.buckets[b].len() {
            return self.locator(b, slot + 1);
        }
        self.locator(self.first_occupied_from(b + 1), 0)
    }

    fn live_position(&self, loc: Locator) -> Result<(usize, usize), StaleLocator> {
        self.check_cursor(loc)?;
        match self.buckets.get(loc.bucket) {
            Some(bucket) if loc.slot < bucket.len() => Ok((loc.bucket, loc.slot)),
            _ => Err(StaleLocator),
        }
    }

    /// First non-empty bucket at or after `from`, or the bucket count.
    fn first_occupied_from(&self, from: usize) -> usize {
        self.buckets
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, b)| !b.is_empty())
            .map_or(self.buckets.len(), |(i, _)| i)
    }

    /// Moves every record into a fresh table of `new_buckets` buckets.
    fn rehash(&mut self, new_buckets: usize) {
        let old = core::mem::replace(&mut self.buckets, allocate(new_buckets));
        let mut moved = 0;
        for mut bucket in old {
            for (key, value) in bucket.take_records() {
                let b = key.bucket(new_buckets);
                self.buckets[b].push(key, value);
                moved += 1;
            }
        }
        debug_assert_eq!(moved, self.len);
        self.epoch += 1;
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let mut total = 0;
        for (i, bucket) in self.buckets.iter().enumerate() {
            bucket.check_invariants();
            for (k, _) in bucket.records() {
                assert_eq!(k.bucket(self.buckets.len()), i, "key {k:?} in wrong bucket");
            }
            total += bucket.len();
        }
        assert_eq!(total, self.len);
    }
}

fn allocate<K: IndexKey, V>(n: usize) -> Vec<FindBucket<K, V>> {
    (0..n).map(|_| FindBucket::new()).collect()
}

impl<K: IndexKey, V> Default for FindMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: IndexKey, V: fmt::Debug> fmt::Debug for FindMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: IndexKey, V: PartialEq> PartialEq for FindMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: IndexKey, V: Eq> Eq for FindMap<K, V> {}

/// Inserts each pair in order; keys already present keep their value.
impl<K: IndexKey, V> Extend<(K, V)> for FindMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: IndexKey, V> FromIterator<(K, V)> for FindMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: IndexKey, V, const N: usize> From<[(K, V); N]> for FindMap<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Iterator over entries in bucket order.
pub struct Iter<'a, K, V> {
    buckets: core::slice::Iter<'a, FindBucket<K, V>>,
    records: core::slice::Iter<'a, (K, V)>,
    remaining: usize,
}

impl<'a, K: IndexKey, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((k, v)) = self.records.next() {
                self.remaining -= 1;
                return Some((k, v));
            }
            self.records = self.buckets.next()?.records().iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: IndexKey, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K: IndexKey, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over entries in bucket order with mutable values.
pub struct IterMut<'a, K, V> {
    buckets: core::slice::IterMut<'a, FindBucket<K, V>>,
    records: core::slice::IterMut<'a, (K, V)>,
    remaining: usize,
}

impl<'a, K: IndexKey, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((k, v)) = self.records.next() {
                self.remaining -= 1;
                return Some((&*k, v));
            }
            self.records = self.buckets.next()?.records_mut().iter_mut();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: IndexKey, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K: IndexKey, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over entries in bucket order.
pub struct IntoIter<K, V> {
    buckets: std::vec::IntoIter<FindBucket<K, V>>,
    records: std::vec::IntoIter<(K, V)>,
    remaining: usize,
}

impl<K: IndexKey, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.records.next() {
                self.remaining -= 1;
                return Some(entry);
            }
            self.records = self.buckets.next()?.take_records().into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: IndexKey, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K: IndexKey, V> FusedIterator for IntoIter<K, V> {}

impl<'a, K: IndexKey, V> IntoIterator for &'a FindMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K: IndexKey, V> IntoIterator for &'a mut FindMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K: IndexKey, V> IntoIterator for FindMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.len,
            buckets: self.buckets.into_iter(),
            records: Vec::new().into_iter(),
        }
    }
}
