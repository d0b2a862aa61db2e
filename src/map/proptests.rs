//! Property-based tests for the map using proptest
//!
//! Each property replays a generated sequence of operations against both a
//! `ConcurrentMap` and a plain `HashMap` model and checks that they agree.

use crate::map::ConcurrentMap;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
enum Op {
    Set(u8, i64),
    Delete(u8),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (any::<u8>(), any::<i64>()).prop_map(|(k, v)| Op::Set(k, v)),
        3 => any::<u8>().prop_map(Op::Delete),
        1 => Just(Op::Clear),
    ]
}

/// Property: single-threaded behavior matches a HashMap model
#[cfg(test)]
mod model_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_matches_hashmap_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let map = ConcurrentMap::new();
            let mut model = HashMap::new();

            for op in &ops {
                match *op {
                    Op::Set(k, v) => {
                        map.set(k, v);
                        model.insert(k, v);
                        prop_assert_eq!(map.get(&k), Some(v));
                    }
                    Op::Delete(k) => {
                        map.delete(&k);
                        model.remove(&k);
                        prop_assert_eq!(map.get(&k), None);
                    }
                    Op::Clear => {
                        map.clear();
                        model.clear();
                        prop_assert_eq!(map.len(), 0);
                    }
                }
                prop_assert_eq!(map.len(), model.len());
            }

            prop_assert_eq!(map.all(), model);
        }

        #[test]
        fn test_keys_values_are_consistent_with_all(
            entries in prop::collection::hash_map(any::<u16>(), any::<i32>(), 0..100)
        ) {
            let map: ConcurrentMap<u16, i32> = entries.clone().into_iter().collect();

            let mut keys = map.keys();
            keys.sort_unstable();
            let mut expected_keys: Vec<_> = entries.keys().copied().collect();
            expected_keys.sort_unstable();
            prop_assert_eq!(keys, expected_keys);

            let mut values = map.values();
            values.sort_unstable();
            let mut expected_values: Vec<_> = entries.values().copied().collect();
            expected_values.sort_unstable();
            prop_assert_eq!(values, expected_values);

            match map.random() {
                Some((k, v)) => prop_assert_eq!(entries.get(&k), Some(&v)),
                None => prop_assert!(entries.is_empty()),
            }
        }

        #[test]
        fn test_delete_is_idempotent(
            entries in prop::collection::hash_map(any::<u8>(), any::<u8>(), 0..50),
            key in any::<u8>()
        ) {
            let map: ConcurrentMap<u8, u8> = entries.into_iter().collect();

            map.delete(&key);
            let once = map.all();
            map.delete(&key);
            prop_assert_eq!(map.all(), once);
        }
    }
}

/// Property: the JSON codec round-trips and fails without side effects
#[cfg(test)]
mod codec_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_json_round_trip(
            entries in prop::collection::hash_map("[a-z0-9_]{0,12}", any::<i64>(), 0..64)
        ) {
            let map: ConcurrentMap<String, i64> = entries.clone().into_iter().collect();
            let json = map.to_json().unwrap();

            let restored: ConcurrentMap<String, i64> = ConcurrentMap::from_json(&json).unwrap();
            prop_assert_eq!(restored.all(), entries.clone());

            let loaded: ConcurrentMap<String, i64> = ConcurrentMap::new();
            loaded.set("__stale__".to_string(), -1);
            loaded.load_json(&json).unwrap();
            prop_assert_eq!(loaded.all(), entries);
        }

        #[test]
        fn test_integer_keys_round_trip(
            entries in prop::collection::hash_map(any::<i32>(), ".{0,8}", 0..32)
        ) {
            let map: ConcurrentMap<i32, String> = entries.clone().into_iter().collect();
            let restored: ConcurrentMap<i32, String> = map.to_string().parse().unwrap();
            prop_assert_eq!(restored.all(), entries);
        }

        #[test]
        fn test_truncated_payload_never_changes_contents(
            entries in prop::collection::hash_map("[a-z]{1,6}", any::<u32>(), 1..16),
            cut in 1usize..64
        ) {
            let source: ConcurrentMap<String, u32> = entries.into_iter().collect();
            let json = source.to_json().unwrap();
            prop_assume!(cut < json.len());

            let map: ConcurrentMap<String, u32> = ConcurrentMap::new();
            map.set("a".to_string(), 1);

            prop_assert!(map.load_json(&json[..cut]).is_err());
            prop_assert_eq!(map.len(), 1);
            prop_assert_eq!(map.get("a"), Some(1));
        }
    }
}

/// Property: concurrent writers on disjoint keys all land
#[cfg(test)]
mod concurrent_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_concurrent_disjoint_writers(
            num_threads in 2usize..8,
            operations_per_thread in 10usize..200
        ) {
            let map = Arc::new(ConcurrentMap::new());
            let mut handles = vec![];

            for thread_id in 0..num_threads {
                let map = Arc::clone(&map);
                handles.push(thread::spawn(move || {
                    for i in 0..operations_per_thread {
                        let key = thread_id * operations_per_thread + i;
                        map.set(key, key);
                        if i % 3 == 0 {
                            map.delete(&key);
                        }
                    }
                }));
            }

            for handle in handles {
                handle.join().unwrap();
            }

            let expected = (0..num_threads * operations_per_thread)
                .filter(|key| (key % operations_per_thread) % 3 != 0)
                .count();
            prop_assert_eq!(map.len(), expected);

            for (key, value) in map.all() {
                prop_assert_eq!(key, value);
                prop_assert!((key % operations_per_thread) % 3 != 0);
            }
        }
    }
}
