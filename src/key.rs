//! Key domain: fixed-width unsigned integers hashed by `key mod buckets`.

use core::fmt::Debug;

/// A key usable by [`FindMap`](crate::FindMap) and [`IterMap`](crate::IterMap).
///
/// The maps never call user code while their structure is transiently
/// inconsistent, so the trait is sealed to the primitive unsigned integers.
pub trait IndexKey: Copy + Eq + Default + Debug + sealed::Sealed {
    /// Bucket index for this key in a table of `buckets` buckets.
    ///
    /// `buckets` is never zero.
    fn bucket(self, buckets: usize) -> usize;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! impl_index_key {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl IndexKey for $t {
                #[inline]
                fn bucket(self, buckets: usize) -> usize {
                    debug_assert!(buckets > 0);
                    // Widen both sides so `u128` keys and 64-bit `usize` agree.
                    (self as u128 % buckets as u128) as usize
                }
            }
        )*
    };
}

impl_index_key!(u8, u16, u32, u64, u128, usize);
