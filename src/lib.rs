//! # lockmap
//!
//! A concurrent hash map built on a single reader-writer lock, with JSON snapshots.
//!
//! ## Features
//!
//! - **Shared reads**: any number of threads may read at once
//! - **Exclusive writes**: each mutation is atomic with respect to every other operation
//! - **Owned snapshots**: `all`, `keys` and `values` return copies, never references
//! - **JSON codec**: serialize the whole map and restore it without tearing
//!
//! ## Quick Start
//!
//! ```rust
//! use lockmap::ConcurrentMap;
//!
//! let map = ConcurrentMap::new();
//! map.set("answer".to_string(), 42);
//! assert_eq!(map.get("answer"), Some(42));
//!
//! let json = map.to_json()?;
//! assert_eq!(json, r#"{"answer":42}"#);
//! # Ok::<(), lockmap::Error>(())
//! ```
//!
//! ## Thread Safety
//!
//! `ConcurrentMap` is `Send + Sync` whenever its keys, values and hasher are, so it
//! can be shared across threads behind an `Arc` without further synchronization.
//!
//! ## Logging
//!
//! Wholesale replacements and codec failures are reported through [`tracing`].
//! The library never installs a subscriber.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod map;
pub mod metrics;

pub use crate::map::ConcurrentMap;
pub use crate::metrics::{MapMetrics, MetricsCollector};

use std::time::Duration;

/// Error types for lockmap operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A key or value could not be represented as JSON
    #[error("failed to encode map: {0}")]
    Encode(#[source] serde_json::Error),
    /// The payload was malformed or did not match the map's key/value types
    #[error("failed to decode map: {0}")]
    Decode(#[source] serde_json::Error),
    /// The lock could not be acquired within the given timeout
    #[error("lock not acquired within {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Check if this is an encode error.
    pub fn is_encode(&self) -> bool {
        matches!(self, Error::Encode(_))
    }

    /// Check if this is a decode error.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }

    /// Check if this is a lock timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

/// Result type for lockmap operations
pub type Result<T> = std::result::Result<T, Error>;
