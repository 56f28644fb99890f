use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use parking_lot::RwLock;
use tracing::{debug, trace};

/// A memoization table for blocking callers.
///
/// Reads take a shared lock and run in parallel. A missing entry is computed while the
/// exclusive lock is held, so each key's compute runs at most once and every caller that
/// raced for it gets the same value.
pub struct MemoTable<K = String, V = String> {
    data: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for MemoTable<K, V> {
    fn default() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> MemoTable<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table with room for at least `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Returns the stored value for `key`, if any. Never computes anything.
    pub fn get(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    /// Returns the stored value for `key`, computing and storing it first if it is missing.
    ///
    /// `compute` runs under the exclusive lock and must not call back into this table. If it
    /// panics, the panic reaches the caller and the entry stays absent.
    pub fn get_or_compute<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }

        let mut data = self.data.write();
        // Another caller may have filled the entry while we waited for the write lock.
        if let Some(value) = data.get(&key) {
            return value.clone();
        }

        trace!("computing missing entry");
        let value = compute();
        data.insert(key, value.clone());
        trace!(entries = data.len(), "entry committed");
        value
    }

    /// Like [`get_or_compute`](Self::get_or_compute), for computations that can fail.
    ///
    /// An `Err` from `compute` is returned as-is and nothing is stored, so a later call can
    /// try again.
    pub fn get_or_try_compute<F, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let mut data = self.data.write();
        if let Some(value) = data.get(&key) {
            return Ok(value.clone());
        }

        trace!("computing missing entry");
        let value = match compute() {
            Ok(value) => value,
            Err(err) => {
                debug!("compute failed, entry left absent");
                return Err(err);
            }
        };
        data.insert(key, value.clone());
        trace!(entries = data.len(), "entry committed");
        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous value. Last write wins.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        let previous = self.data.write().insert(key, value);
        if previous.is_some() {
            debug!("overwrote existing entry");
        }
        previous
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl<K, V> fmt::Debug for MemoTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoTable")
            .field("entries", &self.data.read().len())
            .finish()
    }
}
