//! Map implementations
//!
//! This module provides [`ConcurrentMap`], a hash map behind one reader-writer lock.
//!
//! ## Choosing This Map
//!
//! - Read-heavy workloads with occasional writes benefit most from the shared lock
//! - Whole-map operations (`all`, `to_json`, `load_json`) are atomic, which a
//!   sharded map cannot offer
//! - Under heavy write contention every writer serializes on the one lock;
//!   check `contention_rate()` in [`MapMetrics`](crate::MapMetrics)

mod codec;
pub mod concurrent;
mod finite;

pub use self::concurrent::ConcurrentMap;


#[cfg(test)]
mod proptests;

#[cfg(test)]
mod loom_tests;
