//! Error types surfaced by the map façades.

use core::fmt;

/// Returned by `at`/`at_mut` when the key has no entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KeyNotFound;

impl fmt::Display for KeyNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key not found")
    }
}

impl std::error::Error for KeyNotFound {}

/// Returned when a [`Locator`](crate::find_map::Locator) no longer refers to
/// the entry it was created for, because the map was mutated in a way that
/// relocated or removed it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StaleLocator;

impl fmt::Display for StaleLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("locator was invalidated by a structural mutation of the map")
    }
}

impl std::error::Error for StaleLocator {}
