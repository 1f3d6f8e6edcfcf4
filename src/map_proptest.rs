#![cfg(test)]

// Property tests for FindMap and IterMap kept inside the crate so the
// structural `check_invariants` hooks are reachable after every step.

use crate::{FindMap, IterMap, KeyNotFound, StaleLocator};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Clone, Debug)]
enum Op {
    Insert(u64, i32),
    Erase(u64),
    Remove(u64),
    Find(u64),
    At(u64),
    IndexDefault(u64),
    Mutate(u64, i32),
    EraseAtFound(u64),
    EraseRangeTo(u64),
    EraseRangeHeldAcrossErase(u64),
    EraseWhereOdd,
    Iterate,
    Clear,
}

// Small key space with deliberate collisions: plain small keys plus keys
// that share a residue modulo several bucket counts.
fn arb_key() -> impl Strategy<Value = u64> {
    prop_oneof![
        3 => 0u64..24,
        2 => (0u64..12).prop_map(|k| k * 64 + 5),
        1 => Just(u64::MAX),
    ]
}

fn arb_ops() -> impl Strategy<Value = (usize, Vec<Op>)> {
    let op = prop_oneof![
        6 => (arb_key(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => arb_key().prop_map(Op::Erase),
        1 => arb_key().prop_map(Op::Remove),
        2 => arb_key().prop_map(Op::Find),
        1 => arb_key().prop_map(Op::At),
        1 => arb_key().prop_map(Op::IndexDefault),
        1 => (arb_key(), -100i32..100).prop_map(|(k, d)| Op::Mutate(k, d)),
        1 => arb_key().prop_map(Op::EraseAtFound),
        1 => arb_key().prop_map(Op::EraseRangeTo),
        1 => arb_key().prop_map(Op::EraseRangeHeldAcrossErase),
        1 => Just(Op::EraseWhereOdd),
        1 => Just(Op::Iterate),
        1 => Just(Op::Clear),
    ];
    (1usize..6, proptest::collection::vec(op, 1..120))
}

// Both maps expose the same inherent API, so one body drives either.
macro_rules! state_machine {
    ($map:ty, $buckets:expr, $ops:expr) => {{
        let initial: usize = $buckets;
        let mut sut = <$map>::with_buckets(initial);
        let mut model: HashMap<u64, i32> = HashMap::new();

        for op in $ops {
            match op {
                Op::Insert(k, v) => {
                    let (loc, inserted) = sut.insert(k, v);
                    prop_assert_eq!(inserted, !model.contains_key(&k));
                    let expected = *model.entry(k).or_insert(v);
                    prop_assert_eq!(sut.entry_at(loc), Ok((&k, &expected)));
                }
                Op::Erase(k) => {
                    let removed = sut.erase(&k);
                    prop_assert_eq!(removed, usize::from(model.remove(&k).is_some()));
                    prop_assert!(sut.find(&k).is_none());
                }
                Op::Remove(k) => {
                    prop_assert_eq!(sut.remove(&k), model.remove(&k));
                }
                Op::Find(k) => {
                    let found = sut.find(&k);
                    prop_assert_eq!(found.is_some(), model.contains_key(&k));
                    prop_assert_eq!(sut.count(&k), usize::from(model.contains_key(&k)));
                    if let Some(loc) = found {
                        prop_assert_eq!(sut.entry_at(loc), Ok((&k, &model[&k])));
                    }
                }
                Op::At(k) => match model.get(&k) {
                    Some(v) => {
                        prop_assert_eq!(sut.at(&k), Ok(v));
                    }
                    None => {
                        prop_assert_eq!(sut.at(&k), Err(KeyNotFound));
                    }
                },
                Op::IndexDefault(k) => {
                    let v = *sut.get_or_insert_default(k);
                    prop_assert_eq!(v, *model.entry(k).or_default());
                }
                Op::Mutate(k, d) => {
                    if let Some(v) = sut.get_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                }
                Op::EraseAtFound(k) => {
                    if let Some(loc) = sut.find(&k) {
                        sut.erase_at(loc).map_err(|e| TestCaseError::fail(e.to_string()))?;
                        prop_assert_eq!(sut.erase_at(loc), Err(StaleLocator));
                        model.remove(&k);
                    }
                }
                Op::EraseRangeTo(k) => {
                    // Erase from begin() up to k's entry, or everything if absent.
                    let last = sut.find(&k).unwrap_or_else(|| sut.end());
                    let mut doomed = Vec::new();
                    let mut cur = sut.begin();
                    while cur != last && !sut.is_end(cur) {
                        let (d, _) = sut.entry_at(cur).map_err(|e| TestCaseError::fail(e.to_string()))?;
                        doomed.push(*d);
                        cur = sut.advance(cur).map_err(|e| TestCaseError::fail(e.to_string()))?;
                    }
                    let after = sut
                        .erase_range(sut.begin(), last)
                        .map_err(|e| TestCaseError::fail(e.to_string()))?;
                    for d in &doomed {
                        model.remove(d);
                    }
                    if model.contains_key(&k) {
                        prop_assert_eq!(sut.entry_at(after).map(|(key, _)| *key), Ok(k));
                    } else {
                        prop_assert!(sut.is_end(after));
                    }
                }
                Op::EraseRangeHeldAcrossErase(k) => {
                    // A bound held across the erase of its own entry is stale
                    // at either end, and the rejected call removes nothing.
                    if let Some(held) = sut.find(&k) {
                        prop_assert_eq!(sut.erase(&k), 1);
                        model.remove(&k);
                        prop_assert_eq!(sut.erase_range(held, sut.end()), Err(StaleLocator));
                        prop_assert_eq!(sut.erase_range(sut.begin(), held), Err(StaleLocator));
                        prop_assert_eq!(sut.len(), model.len());
                    }
                }
                Op::EraseWhereOdd => {
                    let mut visited = BTreeSet::new();
                    let mut cur = sut.begin();
                    while !sut.is_end(cur) {
                        let (k, _) = sut.entry_at(cur).map_err(|e| TestCaseError::fail(e.to_string()))?;
                        let k = *k;
                        prop_assert!(visited.insert(k), "key {} visited twice", k);
                        cur = if k % 2 == 1 {
                            sut.erase_at(cur)
                        } else {
                            sut.advance(cur)
                        }
                        .map_err(|e| TestCaseError::fail(e.to_string()))?;
                    }
                    let expected: BTreeSet<u64> = model.keys().copied().collect();
                    prop_assert_eq!(visited, expected);
                    model.retain(|k, _| k % 2 == 0);
                }
                Op::Iterate => {
                    let seen: BTreeMap<u64, i32> = sut.iter().map(|(k, v)| (*k, *v)).collect();
                    let expected: BTreeMap<u64, i32> = model.iter().map(|(k, v)| (*k, *v)).collect();
                    prop_assert_eq!(sut.iter().count(), sut.len());
                    prop_assert_eq!(seen, expected);
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                    prop_assert_eq!(sut.bucket_count(), initial);
                    prop_assert_eq!(sut.begin(), sut.end());
                }
            }

            sut.check_invariants();
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            for (k, v) in &model {
                prop_assert_eq!(sut.get(k), Some(v));
            }
        }
    }};
}

// Property: state-machine equivalence against std::collections::HashMap.
// Small starting bucket counts force collisions, overflowing inline caches
// and several rehashes per case.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn prop_find_map_matches_model((buckets, ops) in arb_ops()) {
        state_machine!(FindMap<u64, i32>, buckets, ops);
    }

    #[test]
    fn prop_iter_map_matches_model((buckets, ops) in arb_ops()) {
        state_machine!(IterMap<u64, i32>, buckets, ops);
    }
}

// Property: growth never loses or duplicates a key. Inserting well past
// twice the starting bucket count must leave every key findable.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

    #[test]
    fn prop_rehash_is_transparent(keys in proptest::collection::hash_set(any::<u64>(), 40..200)) {
        let mut f: FindMap<u64, u64> = FindMap::with_buckets(16);
        let mut i: IterMap<u64, u64> = IterMap::with_buckets(16);
        for &k in &keys {
            prop_assert!(f.insert(k, k ^ 0xa5a5).1);
            prop_assert!(i.insert(k, k ^ 0xa5a5).1);
        }
        prop_assert!(f.bucket_count() > 16);
        prop_assert!(i.bucket_count() > 16);
        f.check_invariants();
        i.check_invariants();
        for &k in &keys {
            prop_assert_eq!(f.at(&k), Ok(&(k ^ 0xa5a5)));
            prop_assert_eq!(i.at(&k), Ok(&(k ^ 0xa5a5)));
        }
        prop_assert_eq!(f.len(), keys.len());
        prop_assert_eq!(i.len(), keys.len());
    }
}
