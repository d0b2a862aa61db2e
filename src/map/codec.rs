//! JSON snapshots for [`ConcurrentMap`]
//!
//! The map encodes as a plain JSON object, `{"key":value,...}`. Keys must be
//! ones `serde_json` can project to member names: strings as-is, and integers,
//! bools and chars as their string form (`{"7":..}`, `{"true":..}`). Any other
//! key shape fails with [`Error::Encode`], and so does a NaN or infinite float
//! anywhere in the map, which JSON has no way to write.
//!
//! Decoding always goes into a temporary `HashMap` first. Only a successful decode
//! takes the exclusive lock, and it swaps the whole container rather than merging.
//!
//! The text hooks (`Display`, `FromStr`) and the serde impls all go through the
//! same `serde_json` encoding.

use super::finite::Finite;
use super::ConcurrentMap;
use crate::{Error, Result};
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::str::FromStr;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use tracing::debug;

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Encode the whole map as a JSON object
    ///
    /// An empty map encodes as `{}`.
    ///
    /// # Errors
    ///
    /// [`Error::Encode`] if a key or value cannot be represented as JSON, including
    /// NaN and infinite floats. No partial output is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lockmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// assert_eq!(map.to_json()?, "{}");
    ///
    /// map.set("pi".to_string(), 3.5);
    /// assert_eq!(map.to_json()?, r#"{"pi":3.5}"#);
    /// # Ok::<(), lockmap::Error>(())
    /// ```
    pub fn to_json(&self) -> Result<String>
    where
        K: Serialize,
        V: Serialize,
    {
        let encoded = serde_json::to_string(&Finite(&*self.read()));
        self.finish_encode(encoded)
    }

    /// Encode the whole map as JSON bytes
    pub fn to_json_vec(&self) -> Result<Vec<u8>>
    where
        K: Serialize,
        V: Serialize,
    {
        let encoded = serde_json::to_vec(&Finite(&*self.read()));
        self.finish_encode(encoded)
    }

    /// Replace the contents of the map with the entries decoded from `data`
    ///
    /// Entries not present in `data` are discarded.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if `data` is not a JSON object whose members convert to
    /// `K` and `V`. The lock is never taken for a failed decode and the map keeps
    /// its previous contents.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lockmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.set("stale".to_string(), 0);
    ///
    /// map.load_json(r#"{"a":1,"b":2}"#)?;
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map.get("stale"), None);
    ///
    /// assert!(map.load_json("{broken").is_err());
    /// assert_eq!(map.get("a"), Some(1));
    /// # Ok::<(), lockmap::Error>(())
    /// ```
    pub fn load_json(&self, data: &str) -> Result<()>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
        S: Default,
    {
        let decoded = serde_json::from_str::<HashMap<K, V, S>>(data);
        self.install(decoded)
    }

    /// Byte-slice variant of [`load_json`](Self::load_json)
    pub fn load_json_slice(&self, data: &[u8]) -> Result<()>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
        S: Default,
    {
        let decoded = serde_json::from_slice::<HashMap<K, V, S>>(data);
        self.install(decoded)
    }

    /// Build a new map from a JSON object
    pub fn from_json(data: &str) -> Result<Self>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
        S: Default,
    {
        serde_json::from_str::<HashMap<K, V, S>>(data)
            .map(Self::from)
            .map_err(|err| {
                debug!(error = %err, "failed to decode map");
                Error::Decode(err)
            })
    }

    fn finish_encode<T>(&self, encoded: serde_json::Result<T>) -> Result<T> {
        match encoded {
            Ok(out) => {
                self.record(|m| m.record_snapshot());
                Ok(out)
            }
            Err(err) => {
                debug!(error = %err, "failed to encode map");
                self.record(|m| m.record_encode_failure());
                Err(Error::Encode(err))
            }
        }
    }

    fn install(&self, decoded: serde_json::Result<HashMap<K, V, S>>) -> Result<()> {
        match decoded {
            Ok(map) => {
                self.replace(map);
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, "failed to decode map, contents unchanged");
                self.record(|m| m.record_decode_failure());
                Err(Error::Decode(err))
            }
        }
    }
}

/// Serializes as a map, rejecting NaN and infinite floats in any format
impl<K, V, S> Serialize for ConcurrentMap<K, V, S>
where
    K: Eq + Hash + Serialize,
    V: Serialize,
    S: BuildHasher,
{
    fn serialize<Ser>(&self, serializer: Ser) -> core::result::Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        Finite(&*self.read()).serialize(serializer)
    }
}

impl<'de, K, V, S> Deserialize<'de> for ConcurrentMap<K, V, S>
where
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        HashMap::<K, V, S>::deserialize(deserializer).map(Self::from)
    }
}

/// Writes the same JSON as [`ConcurrentMap::to_json`]
///
/// Formatting fails with `fmt::Error` where `to_json` would return [`Error::Encode`].
impl<K, V, S> fmt::Display for ConcurrentMap<K, V, S>
where
    K: Eq + Hash + Serialize,
    V: Serialize,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.to_json().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Parses the same JSON as [`ConcurrentMap::from_json`]
impl<K, V, S> FromStr for ConcurrentMap<K, V, S>
where
    K: Eq + Hash + DeserializeOwned,
    V: DeserializeOwned,
    S: BuildHasher + Default,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json(s)
    }
}
