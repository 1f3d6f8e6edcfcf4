//! layout-hashmap: integer-keyed hash maps that control where records live
//! in memory, trading generality for speed on one access pattern each.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: two drop-in alternatives to a general hash map, sharing one
//!   contract (insert/find/erase/iterate, fixed growth policy) but laying
//!   records out differently.
//! - Layers (both variants): bucket index → record storage → map façade.
//!   - `FindMap<K, V>`: every bucket is its own growable record array with
//!     an inline cache of its first keys. Lookups usually compare only
//!     cached keys and never touch value payloads.
//!   - `IterMap<K, V>`: all records sit in one dense array with a free list
//!     for erased slots; buckets hold record indices only. Iteration is a
//!     single linear pass and rehash never moves a record.
//!
//! Constraints
//! - Single-threaded; callers needing shared access serialize externally.
//! - Keys are unsigned integers hashed by `key mod bucket_count`.
//! - Unique keys: `insert` never overwrites an existing value.
//! - Growth is fixed: once `len * 2 > bucket_count`, the next insert grows
//!   the table first (`2n + 1` buckets for `FindMap`, `3n + 1` for
//!   `IterMap`). No external load-factor knobs.
//!
//! Locators
//! - `find`/`insert`/`begin` return small `Copy` locators rather than
//!   references. Every access through a locator is checked: a locator that
//!   a mutation could have redirected to another entry is rejected with
//!   `StaleLocator` instead of resolving.
//! - `FindMap` locators are `(bucket, slot)` plus an epoch that advances
//!   on rehash, erase (swap-remove reorders a bucket) and `clear`.
//! - `IterMap` locators are a record index plus that slot's generation;
//!   they survive rehash and unrelated erases.
//! - `iter()`/`iter_mut()` are the borrow-scoped alternative: the borrow
//!   checker rules out mutation while they are alive.
//!
//! Erase while walking
//! - `erase_at` returns the locator iteration would visit next, computed
//!   before the record is removed, so a `begin`/`erase_at` loop visits each
//!   remaining entry exactly once in both variants.
//!
//! Notes and non-goals
//! - No interior mutability and no internal locking.
//! - No persistence or serialization.
//! - Allocation failure and exhausting `IterMap`'s `u32` record index space
//!   are fatal (panic), like `Vec` capacity overflow.

mod error;
mod find_bucket;
pub mod find_map;
mod index_bucket;
pub mod iter_map;
mod key;
pub mod policy;
mod record_storage;

#[cfg(test)]
mod map_proptest;

// Public surface
pub use error::{KeyNotFound, StaleLocator};
pub use find_map::FindMap;
pub use iter_map::IterMap;
pub use key::IndexKey;
