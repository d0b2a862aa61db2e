//! Reader-Writer Locked HashMap
//!
//! This module implements [`ConcurrentMap`], a hash map guarded by a single
//! `parking_lot` reader-writer lock. Reads take the lock in shared mode and run
//! in parallel; every mutation takes it in exclusive mode.
//!
//! ## Design
//!
//! - One `RwLock<HashMap<K, V, S>>`, no striping
//! - Every operation holds the lock for exactly one call and releases it before returning
//! - Nothing borrowed from the inner map escapes a lock guard; callers get owned copies
//! - Operation counters sit outside the lock (see [`crate::metrics`])
//!
//! ## Ordering Guarantees
//!
//! Exclusive operations are totally ordered. A shared operation observes the map
//! as left by some prefix of that order, so a single value is never seen half-written.
//!
//! ## Example
//!
//! ```rust
//! use lockmap::ConcurrentMap;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let map = Arc::new(ConcurrentMap::new());
//!
//! let writer = thread::spawn({
//!     let map = Arc::clone(&map);
//!     move || {
//!         for i in 0..1000 {
//!             map.set(i, i * 2);
//!         }
//!     }
//! });
//! writer.join().unwrap();
//!
//! let sum: i32 = map.values().into_iter().sum();
//! assert_eq!(sum, 999000);
//! ```

use crate::metrics::{AtomicMetrics, MapMetrics, MetricsCollector};
use crate::{Error, Result};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

/// A hash map that can be shared between threads without external locking
///
/// All methods take `&self`. Reads (`get`, `len`, `all`, `keys`, ...) acquire the
/// lock in shared mode; writes (`set`, `delete`, `clear`, `load_json`, ...) acquire
/// it exclusively.
///
/// # Type Parameters
///
/// * `K` - The key type, must implement `Hash + Eq`
/// * `V` - The value type; copying reads need `Clone`, the JSON codec needs serde
/// * `S` - The hasher builder, `RandomState` by default
///
/// # Examples
///
/// ```rust
/// use lockmap::ConcurrentMap;
///
/// let map: ConcurrentMap<String, u32> = ConcurrentMap::new();
/// map.set("a".to_string(), 1);
/// assert_eq!(map.get("a"), Some(1));
/// assert_eq!(map.get("b"), None);
/// ```
pub struct ConcurrentMap<K, V, S = RandomState> {
    inner: RwLock<HashMap<K, V, S>>,
    metrics: AtomicMetrics,
    metrics_enabled: AtomicBool,
}

impl<K, V> ConcurrentMap<K, V, RandomState> {
    /// Create an empty map
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lockmap::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<i32, String> = ConcurrentMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Create an empty map with room for at least `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> ConcurrentMap<K, V, S> {
    /// Create an empty map that hashes keys with `hasher`
    pub fn with_hasher(hasher: S) -> Self {
        Self::from(HashMap::with_hasher(hasher))
    }

    /// Create an empty map with the given capacity and hasher builder
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self::from(HashMap::with_capacity_and_hasher(capacity, hasher))
    }

    /// Consume the map and return the inner `HashMap`
    ///
    /// No locking is needed: owning the map means no other thread can reach it.
    pub fn into_inner(self) -> HashMap<K, V, S> {
        self.inner.into_inner()
    }

    #[inline]
    pub(crate) fn record(&self, f: impl FnOnce(&AtomicMetrics)) {
        if self.metrics_enabled.load(Ordering::Relaxed) {
            f(&self.metrics);
        }
    }

    /// Acquire the lock in shared mode, noting whether we had to wait
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V, S>> {
        let (guard, contended) = match self.inner.try_read() {
            Some(guard) => (guard, false),
            None => (self.inner.read(), true),
        };
        self.record(|m| m.record_acquisition(contended));
        guard
    }

    /// Acquire the lock in exclusive mode, noting whether we had to wait
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V, S>> {
        let (guard, contended) = match self.inner.try_write() {
            Some(guard) => (guard, false),
            None => (self.inner.write(), true),
        };
        self.record(|m| m.record_acquisition(contended));
        guard
    }

    fn read_for(&self, timeout: Duration) -> Result<RwLockReadGuard<'_, HashMap<K, V, S>>> {
        if let Some(guard) = self.inner.try_read() {
            self.record(|m| m.record_acquisition(false));
            return Ok(guard);
        }
        match self.inner.try_read_for(timeout) {
            Some(guard) => {
                self.record(|m| m.record_acquisition(true));
                Ok(guard)
            }
            None => {
                debug!(?timeout, "shared lock not acquired before timeout");
                self.record(|m| m.record_timeout());
                Err(Error::Timeout(timeout))
            }
        }
    }

    fn write_for(&self, timeout: Duration) -> Result<RwLockWriteGuard<'_, HashMap<K, V, S>>> {
        if let Some(guard) = self.inner.try_write() {
            self.record(|m| m.record_acquisition(false));
            return Ok(guard);
        }
        match self.inner.try_write_for(timeout) {
            Some(guard) => {
                self.record(|m| m.record_acquisition(true));
                Ok(guard)
            }
            None => {
                debug!(?timeout, "exclusive lock not acquired before timeout");
                self.record(|m| m.record_timeout());
                Err(Error::Timeout(timeout))
            }
        }
    }

    /// Get the number of entries in the map
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Swap the whole inner container for `map` and return the previous one
    ///
    /// Entries of the old container are not merged into the new one.
    pub fn replace(&self, map: HashMap<K, V, S>) -> HashMap<K, V, S> {
        let incoming = map.len();
        let previous = core::mem::replace(&mut *self.write(), map);
        trace!(previous = previous.len(), incoming, "replaced map contents");
        self.record(|m| m.record_replacement());
        previous
    }
}

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Get a copy of the value stored for `key`
    ///
    /// # Returns
    ///
    /// * `Some(value)` if the key is present
    /// * `None` if it is not
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lockmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.set(1, "one".to_string());
    /// assert_eq!(map.get(&1), Some("one".to_string()));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let value = self.read().get(key).cloned();
        self.record(|m| m.record_read(value.is_some()));
        value
    }

    /// Run `f` on the value stored for `key` while the shared lock is held
    ///
    /// Useful for values that are expensive to clone or not `Clone` at all.
    /// `f` must not call back into this map at all. A nested write deadlocks, and
    /// so can a nested read: the lock is not reentrant and a queued writer blocks
    /// new readers. Only `Debug`, which never waits for the lock, is safe to use.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lockmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.set("names", vec!["ada", "grace"]);
    /// assert_eq!(map.get_with("names", |names| names.len()), Some(2));
    /// ```
    pub fn get_with<Q, R>(&self, key: &Q, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let result = self.read().get(key).map(f);
        self.record(|m| m.record_read(result.is_some()));
        result
    }

    /// Check whether `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.read().contains_key(key);
        self.record(|m| m.record_read(found));
        found
    }

    /// Insert `value` for `key`, overwriting any previous value
    ///
    /// Any operation that starts after this call returns observes the new value.
    pub fn set(&self, key: K, value: V) {
        self.write().insert(key, value);
        self.record(|m| m.record_write());
    }

    /// Remove the entry for `key`
    ///
    /// Deleting an absent key is a no-op.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lockmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.set(1, 10);
    /// map.delete(&1);
    /// map.delete(&1);
    /// assert!(map.is_empty());
    /// ```
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write().remove(key);
        self.record(|m| m.record_removal());
    }

    /// Discard every entry
    ///
    /// The inner container is replaced by a fresh one built from a clone of the
    /// hasher builder. Copies returned earlier by [`all`](Self::all),
    /// [`keys`](Self::keys) or [`values`](Self::values) are unaffected.
    pub fn clear(&self)
    where
        S: Clone,
    {
        {
            let mut guard = self.write();
            let fresh = HashMap::with_hasher(guard.hasher().clone());
            *guard = fresh;
        }
        self.record(|m| m.record_clear());
    }

    /// Get an independent copy of the whole map
    ///
    /// Mutating the returned `HashMap` never affects this map.
    pub fn all(&self) -> HashMap<K, V, S>
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        let all = self.read().clone();
        self.record(|m| m.record_snapshot());
        all
    }

    /// Get all keys, in the inner container's iteration order at the time of the call
    ///
    /// The order is not stable across calls. An empty map yields an empty `Vec`.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let keys = self.read().keys().cloned().collect();
        self.record(|m| m.record_snapshot());
        keys
    }

    /// Get all values, in the inner container's iteration order at the time of the call
    ///
    /// Each call makes its own pass, so there is no positional correspondence
    /// with an earlier or later [`keys`](Self::keys) call.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let values = self.read().values().cloned().collect();
        self.record(|m| m.record_snapshot());
        values
    }

    /// Get some entry of the map, or `None` if it is empty
    ///
    /// Despite the name this is **not** a uniform random sample: it returns the
    /// first entry the inner container's iteration yields. With the default
    /// `RandomState` hasher that entry varies between map instances, but a map
    /// that is not modified keeps returning the same entry. Callers that need a
    /// statistically random pick should sample from [`keys`](Self::keys) instead.
    pub fn random(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let entry = self
            .read()
            .iter()
            .next()
            .map(|(key, value)| (key.clone(), value.clone()));
        self.record(|m| m.record_snapshot());
        entry
    }

    /// Like [`get`](Self::get), but give up with [`Error::Timeout`] if the lock
    /// cannot be acquired within `timeout`
    pub fn try_get_for<Q>(&self, key: &Q, timeout: Duration) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let value = self.read_for(timeout)?.get(key).cloned();
        self.record(|m| m.record_read(value.is_some()));
        Ok(value)
    }

    /// Like [`set`](Self::set), but give up with [`Error::Timeout`] if the lock
    /// cannot be acquired within `timeout`
    ///
    /// On timeout the map is unchanged and `key`/`value` are dropped.
    pub fn try_set_for(&self, key: K, value: V, timeout: Duration) -> Result<()> {
        self.write_for(timeout)?.insert(key, value);
        self.record(|m| m.record_write());
        Ok(())
    }
}

impl<K, V, S> MetricsCollector for ConcurrentMap<K, V, S> {
    fn metrics(&self) -> MapMetrics {
        self.metrics.snapshot()
    }

    fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.metrics_enabled.store(enabled, Ordering::Relaxed);
    }

    fn is_metrics_enabled(&self) -> bool {
        self.metrics_enabled.load(Ordering::Relaxed)
    }
}

impl<K, V, S> From<HashMap<K, V, S>> for ConcurrentMap<K, V, S> {
    fn from(map: HashMap<K, V, S>) -> Self {
        Self {
            inner: RwLock::new(map),
            metrics: AtomicMetrics::default(),
            metrics_enabled: AtomicBool::new(cfg!(feature = "metrics")),
        }
    }
}

impl<K, V, S: Default> Default for ConcurrentMap<K, V, S> {
    fn default() -> Self {
        Self::from(HashMap::default())
    }
}

impl<K, V, S> Clone for ConcurrentMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    /// Deep copy under the shared lock; the copy starts with fresh metrics.
    fn clone(&self) -> Self {
        let copy = Self::from(self.read().clone());
        copy.set_metrics_enabled(self.is_metrics_enabled());
        copy
    }
}

impl<K, V, S> fmt::Debug for ConcurrentMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // try_read: formatting from inside a write critical section must not deadlock
        match self.inner.try_read() {
            Some(guard) => f.debug_map().entries(guard.iter()).finish(),
            None => f.write_str("ConcurrentMap { <locked> }"),
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(HashMap::from_iter(iter))
    }
}

impl<K, V, S> Extend<(K, V)> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let enabled = *self.metrics_enabled.get_mut();
        let map = self.inner.get_mut();
        for (key, value) in iter {
            map.insert(key, value);
            if enabled {
                self.metrics.record_write();
            }
        }
    }
}

/// Insert a batch under a single exclusive acquisition
///
/// The lock is held while `iter` runs, so the iterator must not call back into
/// this map (reads included) or it may deadlock. `Debug` is the one exception.
impl<K, V, S> Extend<(K, V)> for &ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let mut guard = self.write();
        for (key, value) in iter {
            guard.insert(key, value);
            self.record(|m| m.record_write());
        }
    }
}
