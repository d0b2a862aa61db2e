//! Loom-based model checking of the map's lock discipline
//!
//! Loom cannot instrument `parking_lot`, so these tests model `ConcurrentMap`
//! with Loom's own `RwLock` around the same `HashMap` and explore every
//! interleaving of the operations that matter: single-key writes against
//! reads, and whole-container swaps against snapshots.

#[cfg(test)]
mod loom_tests {
    use loom::sync::{Arc, RwLock};
    use loom::thread;
    use std::collections::HashMap;

    /// Simplified map for Loom testing, same shape as `ConcurrentMap`
    struct LoomMap {
        inner: RwLock<HashMap<u32, (u32, u32)>>,
    }

    impl LoomMap {
        fn new() -> Self {
            Self {
                inner: RwLock::new(HashMap::new()),
            }
        }

        fn set(&self, key: u32, value: (u32, u32)) {
            self.inner.write().unwrap().insert(key, value);
        }

        fn get(&self, key: u32) -> Option<(u32, u32)> {
            self.inner.read().unwrap().get(&key).copied()
        }

        fn delete(&self, key: u32) {
            self.inner.write().unwrap().remove(&key);
        }

        fn all(&self) -> HashMap<u32, (u32, u32)> {
            self.inner.read().unwrap().clone()
        }

        /// Build the replacement outside the lock, then swap it in
        fn load(&self, entries: &[(u32, (u32, u32))]) {
            let decoded: HashMap<_, _> = entries.iter().copied().collect();
            *self.inner.write().unwrap() = decoded;
        }
    }

    /// A reader sees either no value or a complete one, never a mix
    #[test]
    fn loom_test_set_get_no_torn_values() {
        loom::model(|| {
            let map = Arc::new(LoomMap::new());
            map.set(1, (0, 0));

            let writer = thread::spawn({
                let map = Arc::clone(&map);
                move || {
                    map.set(1, (7, 7));
                }
            });

            let value = map.get(1).unwrap();
            assert!(value == (0, 0) || value == (7, 7));

            writer.join().unwrap();
            assert_eq!(map.get(1), Some((7, 7)));
        });
    }

    /// Two writers to the same key are totally ordered
    #[test]
    fn loom_test_concurrent_writers_serialize() {
        loom::model(|| {
            let map = Arc::new(LoomMap::new());

            let a = thread::spawn({
                let map = Arc::clone(&map);
                move || map.set(1, (1, 1))
            });
            let b = thread::spawn({
                let map = Arc::clone(&map);
                move || map.set(1, (2, 2))
            });

            a.join().unwrap();
            b.join().unwrap();

            let value = map.get(1).unwrap();
            assert!(value == (1, 1) || value == (2, 2));
            assert_eq!(map.all().len(), 1);
        });
    }

    /// A snapshot taken during a swap is the old or the new container, whole
    #[test]
    fn loom_test_load_is_atomic_for_snapshots() {
        loom::model(|| {
            let map = Arc::new(LoomMap::new());
            map.load(&[(1, (1, 1)), (2, (1, 1))]);

            let loader = thread::spawn({
                let map = Arc::clone(&map);
                move || map.load(&[(3, (2, 2))])
            });

            let snapshot = map.all();
            match snapshot.len() {
                2 => assert!(snapshot.values().all(|v| *v == (1, 1))),
                1 => assert_eq!(snapshot.get(&3), Some(&(2, 2))),
                n => panic!("partial snapshot with {} entries", n),
            }

            loader.join().unwrap();
            assert_eq!(map.all().len(), 1);
        });
    }

    /// Delete racing a set leaves the map in one of the two linearized states
    #[test]
    fn loom_test_delete_races_set() {
        loom::model(|| {
            let map = Arc::new(LoomMap::new());

            let setter = thread::spawn({
                let map = Arc::clone(&map);
                move || map.set(5, (5, 5))
            });
            let deleter = thread::spawn({
                let map = Arc::clone(&map);
                move || map.delete(5)
            });

            setter.join().unwrap();
            deleter.join().unwrap();

            let value = map.get(5);
            assert!(value.is_none() || value == Some((5, 5)));
        });
    }
}
