//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the store's structural invariants under
//! arbitrary operation sequences.

use proptest::prelude::*;

use crate::cache::CacheStore;

// == Test Configuration ==
// Small limits so random sequences actually trigger eviction.
const TEST_MAX_TOTAL: usize = 4096;
const TEST_MAX_OBJECT: usize = 512;

// == Strategies ==
/// Generates cache keys from a small alphabet so sequences revisit keys.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-d]{1,3}".prop_map(|s| format!("{s}:80/"))
}

/// Generates bodies that are usually cacheable but sometimes over the
/// object limit, exercising the rejection path.
fn body_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..600)
}

/// Generates bodies that always fit under the object limit.
fn cacheable_body_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..500)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Insert { key: String, body: Vec<u8> },
    Lookup { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), body_strategy())
            .prop_map(|(key, body)| CacheOp::Insert { key, body }),
        key_strategy().prop_map(|key| CacheOp::Lookup { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // *For any* sequence of inserts and lookups, the recency list, the
    // bucket chains, and the byte accounting stay mutually consistent and
    // within capacity at every step.
    #[test]
    fn prop_invariants_hold_under_any_op_sequence(
        ops in prop::collection::vec(cache_op_strategy(), 1..100)
    ) {
        let mut store = CacheStore::new(TEST_MAX_TOTAL, TEST_MAX_OBJECT);

        for op in ops {
            match op {
                CacheOp::Insert { key, body } => {
                    let _ = store.insert(&key, body);
                }
                CacheOp::Lookup { key } => {
                    let _ = store.lookup(&key);
                }
            }
            if let Err(violation) = store.check_consistency() {
                prop_assert!(false, "invariant violated: {violation}");
            }
            prop_assert!(store.total_size() <= TEST_MAX_TOTAL);
        }
    }

    // *For any* key-body pair, a successful lookup leaves that key as the
    // most recently used entry.
    #[test]
    fn prop_lookup_promotes_to_most_recent(
        fill in prop::collection::vec((key_strategy(), cacheable_body_strategy()), 1..20),
        probe in key_strategy()
    ) {
        let mut store = CacheStore::new(TEST_MAX_TOTAL, TEST_MAX_OBJECT);
        for (key, body) in fill {
            let _ = store.insert(&key, body);
        }

        if store.lookup(&probe).is_some() {
            prop_assert_eq!(store.mru_key(), Some(probe.as_str()));
        }
        prop_assert!(store.check_consistency().is_ok());
    }

    // *For any* key, storing a body B1 and then B2 keeps exactly one
    // resident entry whose bytes are B2, with no double-counted size.
    #[test]
    fn prop_update_does_not_duplicate(
        key in key_strategy(),
        body1 in cacheable_body_strategy(),
        body2 in cacheable_body_strategy()
    ) {
        let mut store = CacheStore::new(TEST_MAX_TOTAL, TEST_MAX_OBJECT);
        store.insert(&key, body1).unwrap();
        store.insert(&key, body2.clone()).unwrap();

        prop_assert_eq!(store.len(), 1);
        prop_assert_eq!(store.total_size(), body2.len());
        prop_assert_eq!(store.lookup(&key), Some(body2));
        prop_assert!(store.check_consistency().is_ok());
    }

    // *For any* run of distinct fixed-size inserts past capacity, the
    // resident set is exactly the most recent suffix of the insertion
    // order.
    #[test]
    fn prop_eviction_keeps_most_recent_suffix(extra in 1usize..20) {
        let body_len = 256;
        let capacity_entries = TEST_MAX_TOTAL / body_len;
        let total = capacity_entries + extra;

        let mut store = CacheStore::new(TEST_MAX_TOTAL, TEST_MAX_OBJECT);
        let keys: Vec<String> = (0..total).map(|i| format!("k{i}:80/")).collect();
        for key in &keys {
            store.insert(key, vec![0u8; body_len]).unwrap();
        }

        for (i, key) in keys.iter().enumerate() {
            if i < extra {
                prop_assert!(!store.contains(key), "key {key} should be evicted");
            } else {
                prop_assert!(store.contains(key), "key {key} should be resident");
            }
        }
        prop_assert!(store.check_consistency().is_ok());
    }
}
