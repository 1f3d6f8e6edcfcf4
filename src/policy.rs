//! Fixed layout and growth policy shared by both map variants.
//!
//! None of these are runtime knobs; they are compile-time constants so the
//! bucket layouts stay the same size everywhere.

/// Bucket count used by `new()` and restored by `clear()` on such maps.
pub const DEFAULT_BUCKET_COUNT: usize = 8096;

/// Keys mirrored inline by a find-optimized bucket. Six `u64` keys plus the
/// record vector fill one cache line.
pub const INLINE_KEYS: usize = 6;

/// Record indices held inline by an iteration-optimized bucket before
/// spilling into its overflow list.
pub const INLINE_INDICES: usize = 4;

/// First allocation size of a find-optimized bucket's record array.
pub const INITIAL_RECORD_CAPACITY: usize = 2;

/// Bucket count multiplier when a `FindMap` grows.
pub const FIND_MAP_GROWTH: usize = 2;

/// Bucket count multiplier when an `IterMap` grows.
pub const ITER_MAP_GROWTH: usize = 3;

/// Whether a map holding `len` entries across `buckets` buckets must grow
/// before taking another insert.
#[inline]
pub(crate) fn needs_growth(len: usize, buckets: usize) -> bool {
    len.saturating_mul(2) > buckets
}

/// Next bucket count for a table of `buckets` buckets growing by `factor`.
#[inline]
pub(crate) fn grown_bucket_count(buckets: usize, factor: usize) -> usize {
    buckets
        .checked_mul(factor)
        .and_then(|n| n.checked_add(1))
        .unwrap_or_else(|| panic!("bucket count overflow growing from {buckets}"))
}

/// Clamp a requested bucket count so `key mod n` is always defined.
#[inline]
pub(crate) fn clamp_bucket_count(requested: usize) -> usize {
    requested.max(1)
}
