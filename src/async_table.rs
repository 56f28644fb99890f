use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, trace};

type Slot<V> = Arc<OnceCell<V>>;

/// A memoization table for async tasks.
///
/// The map lock is only held to look up or insert a key's slot. The compute itself runs
/// inside the slot's [`OnceCell`], so tasks racing on one key wait for a single compute while
/// computes for different keys proceed in parallel.
///
/// A slot whose compute failed, panicked or was cancelled stays empty and reads as absent;
/// the next caller for that key starts a new compute.
pub struct AsyncMemoTable<K = String, V = String> {
    slots: RwLock<HashMap<K, Slot<V>>>,
}

impl<K, V> Default for AsyncMemoTable<K, V> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> AsyncMemoTable<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.slots
            .read()
            .await
            .get(key)
            .and_then(|slot| slot.get().cloned())
    }

    /// Returns the value for `key`, awaiting `compute` to produce it if it is missing.
    ///
    /// Only one `compute` per key is ever driven to completion; concurrent callers wait for it
    /// and receive its output. `compute` must not await this table for the same key.
    pub async fn get_or_compute<F>(&self, key: K, compute: F) -> V
    where
        F: Future<Output = V>,
    {
        let slot = self.slot(key).await;
        slot.get_or_init(|| async {
            trace!("computing missing entry");
            let value = compute.await;
            trace!("entry committed");
            value
        })
        .await
        .clone()
    }

    /// Like [`get_or_compute`](Self::get_or_compute), for computations that can fail.
    ///
    /// The error is returned unchanged and the slot stays empty.
    pub async fn get_or_try_compute<F, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key).await;
        slot.get_or_try_init(|| async {
            trace!("computing missing entry");
            let result = compute.await;
            match &result {
                Ok(_) => trace!("entry committed"),
                Err(_) => debug!("compute failed, entry left absent"),
            }
            result
        })
        .await
        .cloned()
    }

    /// Stores `value` under `key`, replacing any previous value. Last write wins.
    ///
    /// A compute still in flight for the replaced slot resolves for the callers already
    /// waiting on it but is not stored.
    pub async fn set(&self, key: K, value: V) -> Option<V> {
        let slot = Arc::new(OnceCell::from(value));
        let previous = self.slots.write().await.insert(key, slot);
        let previous = previous.and_then(|slot| slot.get().cloned());
        if previous.is_some() {
            debug!("overwrote existing entry");
        }
        previous
    }

    pub async fn contains_key(&self, key: &K) -> bool {
        self.slots
            .read()
            .await
            .get(key)
            .is_some_and(|slot| slot.initialized())
    }

    /// Number of keys holding a value.
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn slot(&self, key: K) -> Slot<V> {
        let existing = self.slots.read().await.get(&key).cloned();
        if let Some(slot) = existing {
            return slot;
        }

        let mut slots = self.slots.write().await;
        slots.entry(key).or_default().clone()
    }
}
