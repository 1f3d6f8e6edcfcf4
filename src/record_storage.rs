//! RecordStorage: the dense record array behind an `IterMap`.
//!
//! All entries of the map live in one array. Erased slots become holes and
//! their indices go on a LIFO free list; inserts refill holes before the
//! array grows. Records never move once stored, so an index handed to a
//! bucket stays valid until that record is erased.
//!
//! Occupancy is a tagged slot state rather than a reserved key value, so
//! every key in the domain (including `0` and `MAX`) is storable. Each slot
//! also carries a generation that advances when the slot is vacated, which
//! lets the map reject locators to an erased-then-reused slot.

use crate::key::IndexKey;

#[derive(Clone, Debug)]
pub(crate) struct Slot<K, V> {
    pub(crate) generation: u32,
    pub(crate) entry: Option<(K, V)>,
}

#[derive(Clone, Debug)]
pub(crate) struct RecordStorage<K, V> {
    // `slots.len()` is the cursor: every slot past it has never been used.
    slots: Vec<Slot<K, V>>,
    free: Vec<u32>,
    live: usize,
}

impl<K: IndexKey, V> RecordStorage<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live records.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Index of the first never-used slot; iteration stops here.
    #[inline]
    pub(crate) fn next_empty_slot_cursor(&self) -> usize {
        self.slots.len()
    }

    /// Index of the first live slot, or the cursor when there is none.
    pub(crate) fn first_nonempty_slot(&self) -> usize {
        self.next_occupied_from(0)
    }

    /// First live slot at or after `from`, or the cursor.
    pub(crate) fn next_occupied_from(&self, from: usize) -> usize {
        let cursor = self.slots.len();
        if from >= cursor {
            return cursor;
        }
        self.slots[from..]
            .iter()
            .position(|s| s.entry.is_some())
            .map_or(cursor, |i| from + i)
    }

    /// Stores a record, reusing the most recently freed slot if any.
    pub(crate) fn insert(&mut self, key: K, value: V) -> u32 {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.entry.is_none(), "free list held a live slot");
            slot.entry = Some((key, value));
            return index;
        }
        let index = u32::try_from(self.slots.len())
            .unwrap_or_else(|_| panic!("record storage exhausted the u32 index space"));
        if self.slots.len() == self.slots.capacity() {
            let additional = self.slots.capacity().max(1);
            self.slots.reserve_exact(additional);
        }
        self.slots.push(Slot {
            generation: 0,
            entry: Some((key, value)),
        });
        index
    }

    /// Holes the slot and queues it for reuse. Other records stay put.
    pub(crate) fn erase(&mut self, index: u32) -> Option<(K, V)> {
        let slot = self.slots.get_mut(index as usize)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        self.free.push(index);
        Some(entry)
    }

    #[inline]
    pub(crate) fn key(&self, index: u32) -> Option<K> {
        self.get(index).map(|(k, _)| *k)
    }

    #[inline]
    pub(crate) fn get(&self, index: u32) -> Option<(&K, &V)> {
        let (k, v) = self.slots.get(index as usize)?.entry.as_ref()?;
        Some((k, v))
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: u32) -> Option<(&K, &mut V)> {
        let (k, v) = self.slots.get_mut(index as usize)?.entry.as_mut()?;
        Some((&*k, v))
    }

    /// Occupancy of a slot that was handed out by `insert`.
    #[inline]
    pub(crate) fn entry_mut(&mut self, index: u32) -> &mut Option<(K, V)> {
        &mut self.slots[index as usize].entry
    }

    /// Generation of a live slot.
    pub(crate) fn generation(&self, index: u32) -> Option<u32> {
        let slot = self.slots.get(index as usize)?;
        slot.entry.as_ref().map(|_| slot.generation)
    }

    /// Slots from the first live one up to the cursor. Holes included.
    pub(crate) fn occupied_range(&self) -> &[Slot<K, V>] {
        &self.slots[self.first_nonempty_slot()..]
    }

    pub(crate) fn occupied_range_mut(&mut self) -> &mut [Slot<K, V>] {
        let first = self.first_nonempty_slot();
        &mut self.slots[first..]
    }

    pub(crate) fn into_slots(self) -> Vec<Slot<K, V>> {
        self.slots
    }

    /// `(index, key)` of every live record, in slot order.
    pub(crate) fn live_keys(&self) -> impl Iterator<Item = (u32, K)> + '_ {
        let first = self.first_nonempty_slot();
        self.slots[first..]
            .iter()
            .enumerate()
            .filter_map(move |(i, s)| s.entry.as_ref().map(|(k, _)| ((first + i) as u32, *k)))
    }

    /// Drops all records and starts over with `capacity` reserved slots.
    pub(crate) fn clear(&mut self, capacity: usize) {
        self.slots = Vec::with_capacity(capacity);
        self.free.clear();
        self.live = 0;
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let live = self.slots.iter().filter(|s| s.entry.is_some()).count();
        assert_eq!(live, self.live, "live count drifted");
        let holes = self.slots.len() - live;
        assert_eq!(holes, self.free.len(), "every hole must be on the free list");
        for &i in &self.free {
            assert!(self.slots[i as usize].entry.is_none(), "free list holds live slot {i}");
        }
    }
}
